//! Instruction prompt assembly.
//!
//! A prompt is a single `[INST] ... [/INST]` block. Phrasing varies between
//! calls through the injected RNG, so a seeded RNG gives reproducible output.

use std::fmt::Write as _;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::classifier::{EmotionScore, SentimentResult};
use crate::crisis::UrgencyLevel;
use crate::exemplars::Exemplar;
use crate::message::{render_history, ChatMessage};

/// Opening of an instruction block.
pub const INST_START: &str = "[INST]";

/// Close of an instruction block.
pub const INST_END: &str = "[/INST]";

/// Default assistant name.
pub const DEFAULT_ASSISTANT_NAME: &str = "Athena";

const PERSONAS: &[&str] = &[
    "You are {name}, a warm and patient mental health support companion. Listen carefully and respond with empathy.",
    "You are {name}, a compassionate listener who helps people talk through difficult feelings. Be gentle and never judgmental.",
    "You are {name}, a supportive assistant for emotional well-being. Validate what the user feels before offering any suggestion.",
];

const INTRODUCTIONS: &[&str] = &[
    "Briefly introduce yourself as {name} before responding.",
    "Start by introducing yourself as {name} in one short sentence.",
    "Let the user know your name is {name} and that you are here to listen.",
];

const CRISIS_CLAUSE: &str = "IMPORTANT: The user may be in immediate danger. Respond with calm compassion and urge them to contact emergency services or a crisis line right away.";

const CONCERN_CLAUSE: &str = "Note: The user shows signs of distress. Gently acknowledge their feelings and suggest talking to someone they trust or a professional.";

/// Everything the builder needs for one turn.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub user_input: &'a str,
    pub history: &'a [ChatMessage],
    pub urgency: Option<UrgencyLevel>,
    pub sentiment: Option<&'a SentimentResult>,
    pub emotions: &'a [EmotionScore],
    pub exemplars: &'a [&'a Exemplar],
    /// Local hour of day, 0-23.
    pub hour: u32,
}

impl<'a> PromptContext<'a> {
    /// Creates a context with only the user input set.
    pub fn new(user_input: &'a str, hour: u32) -> Self {
        Self {
            user_input,
            history: &[],
            urgency: None,
            sentiment: None,
            emotions: &[],
            exemplars: &[],
            hour,
        }
    }

    /// True when there is no prior conversation.
    pub fn is_first_message(&self) -> bool {
        self.history.is_empty()
    }
}

/// Returns the greeting for a local hour of day.
pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Builds instruction prompts for the generation backend.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    assistant_name: String,
}

impl PromptBuilder {
    /// Creates a builder using `assistant_name` in persona lines.
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
        }
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    /// Assembles the prompt for `ctx`.
    pub fn build(&self, ctx: &PromptContext<'_>, rng: &mut impl Rng) -> String {
        let mut out = String::new();
        let persona = PERSONAS.choose(rng).unwrap_or(&PERSONAS[0]);
        let _ = writeln!(out, "{} {}", INST_START, self.named(persona));

        if ctx.is_first_message() {
            let intro = INTRODUCTIONS.choose(rng).unwrap_or(&INTRODUCTIONS[0]);
            let _ = writeln!(
                out,
                "{}! {}",
                greeting_for_hour(ctx.hour),
                self.named(intro)
            );
        }

        if !ctx.exemplars.is_empty() {
            out.push_str("\nExamples of supportive replies:\n");
            for exemplar in ctx.exemplars {
                let _ = writeln!(out, "User: {}", exemplar.prompt.trim());
                let _ = writeln!(out, "Assistant: {}", exemplar.response.trim());
            }
        }

        match ctx.urgency {
            Some(UrgencyLevel::Crisis) => {
                let _ = writeln!(out, "\n{}", CRISIS_CLAUSE);
            }
            Some(UrgencyLevel::Concern) => {
                let _ = writeln!(out, "\n{}", CONCERN_CLAUSE);
            }
            None => {}
        }

        if let Some(summary) = mood_summary(ctx.sentiment, ctx.emotions) {
            let _ = writeln!(out, "\n{}", summary);
        }

        out.push('\n');
        if !ctx.history.is_empty() {
            out.push_str("Conversation so far:\n");
            out.push_str(&render_history(ctx.history));
        }
        let _ = write!(
            out,
            "User: {}\nAssistant: {}",
            ctx.user_input.trim(),
            INST_END
        );
        out
    }

    fn named(&self, template: &str) -> String {
        template.replace("{name}", &self.assistant_name)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ASSISTANT_NAME)
    }
}

fn mood_summary(sentiment: Option<&SentimentResult>, emotions: &[EmotionScore]) -> Option<String> {
    if sentiment.is_none() && emotions.is_empty() {
        return None;
    }

    let mut summary = String::from("The user's message reads as");
    match sentiment {
        Some(s) => {
            let _ = write!(summary, " {} (confidence {:.2}).", s.label, s.confidence);
        }
        None => summary.push_str(" unclear."),
    }
    if !emotions.is_empty() {
        let listed: Vec<String> = emotions
            .iter()
            .map(|e| format!("{} ({:.2})", e.label, e.score))
            .collect();
        let _ = write!(summary, " Top emotions: {}.", listed.join(", "));
    }
    summary.push_str(" Adapt your tone accordingly.");
    Some(summary)
}
