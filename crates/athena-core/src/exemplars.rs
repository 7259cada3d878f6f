//! Retrieval of example exchanges to ground the prompt.
//!
//! Exemplars are ranked by how many of the query's content words they
//! share; stopwords and very short tokens are ignored.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of exemplars included in a prompt.
pub const DEFAULT_EXEMPLAR_COUNT: usize = 2;

const MIN_TOKEN_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "all", "any", "can", "had", "her",
    "was", "one", "our", "out", "has", "have", "him", "his", "how", "its", "may", "now", "see",
    "who", "did", "get", "got", "let", "say", "she", "too", "use", "that", "this", "with",
    "from", "they", "them", "then", "than", "what", "when", "where", "which", "will", "would",
    "should", "could", "there", "their", "about", "been", "just", "like", "very", "really",
    "some", "into", "also", "because", "i'm", "i've", "don't", "it's", "feel", "feeling",
];

/// Errors loading an exemplar file.
#[derive(Debug, Error)]
pub enum ExemplarError {
    #[error("failed to read exemplars: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid exemplar file: {0}")]
    Json(#[from] serde_json::Error),
}

/// An example user message with a good supportive response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemplar {
    pub prompt: String,
    pub response: String,
}

struct IndexedExemplar {
    exemplar: Exemplar,
    tokens: HashSet<String>,
}

/// In-memory exemplar index.
pub struct ExemplarStore {
    entries: Vec<IndexedExemplar>,
}

impl ExemplarStore {
    /// Indexes the given exemplars.
    pub fn new(exemplars: Vec<Exemplar>) -> Self {
        let entries = exemplars
            .into_iter()
            .map(|exemplar| IndexedExemplar {
                tokens: tokenize(&exemplar.prompt),
                exemplar,
            })
            .collect();
        Self { entries }
    }

    /// Parses a JSON array of `{prompt, response}` objects.
    pub fn from_json_str(json: &str) -> Result<Self, ExemplarError> {
        let exemplars: Vec<Exemplar> = serde_json::from_str(json)?;
        Ok(Self::new(exemplars))
    }

    /// Loads exemplars from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExemplarError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Returns the number of exemplars.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store has no exemplars.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns up to `k` exemplars sharing content words with `text`.
    ///
    /// Higher overlap ranks first; ties keep file order.
    pub fn retrieve(&self, text: &str, k: usize) -> Vec<&Exemplar> {
        let query = tokenize(text);
        if query.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &Exemplar)> = self
            .entries
            .iter()
            .map(|e| (e.tokens.intersection(&query).count(), &e.exemplar))
            .filter(|(overlap, _)| *overlap > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(k).map(|(_, e)| e).collect()
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\''))
        .filter(|w| w.chars().count() >= MIN_TOKEN_LEN && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}
