//! Support resources offered alongside urgent replies.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::crisis::UrgencyLevel;

/// Resource lists per urgency level.
///
/// The `general` list is always included in recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSet {
    pub crisis: Vec<String>,
    pub concern: Vec<String>,
    pub general: Vec<String>,
}

impl ResourceSet {
    /// Returns the entries for `urgency` unioned with the general set.
    ///
    /// Duplicates are removed. Callers must not rely on the order.
    pub fn recommend(&self, urgency: Option<UrgencyLevel>) -> Vec<String> {
        let level: &[String] = match urgency {
            Some(UrgencyLevel::Crisis) => &self.crisis,
            Some(UrgencyLevel::Concern) => &self.concern,
            None => &[],
        };

        let mut seen = HashSet::new();
        level
            .iter()
            .chain(self.general.iter())
            .filter(|r| seen.insert(r.as_str()))
            .cloned()
            .collect()
    }

    /// Formats the block appended to a reply, or `None` without urgency.
    pub fn reply_block(&self, urgency: Option<UrgencyLevel>) -> Option<String> {
        let level = urgency?;
        let resources = self.recommend(Some(level)).join("\n");
        let block = match level {
            UrgencyLevel::Crisis => format!(
                "\nI'm very concerned about your safety. Please consider reaching out to:\n{}",
                resources
            ),
            UrgencyLevel::Concern => {
                format!("\nThese resources might be helpful:\n{}", resources)
            }
        };
        Some(block)
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ResourceSet {
    fn default() -> Self {
        Self {
            crisis: owned(&[
                "**Emergency Services**: 911 (US/Canada), 112 (Europe), 000 (Australia), or your local emergency number.",
                "**National Suicide Prevention Lifeline (US)**: Call or text 988.",
                "**Crisis Text Line**: Text HOME to 741741 (US/Canada) or 85258 (UK).",
                "**Samaritans (UK)**: Call 116 123.",
                "**Lifeline (Australia)**: Call 13 11 14.",
                "**IASP Crisis Centres**: Find a center near you at https://www.iasp.info/resources/Crisis_Centres/",
            ]),
            concern: owned(&[
                "**SAMHSA National Helpline (US)**: 1-800-662-HELP (4357).",
                "**NAMI Helpline (US)**: 1-800-950-NAMI (6264).",
                "**7 Cups**: Free online peer support at https://www.7cups.com",
                "**Warmline**: Find a peer-run listening line at https://warmline.org/warmdir.html#directory",
            ]),
            general: owned(&[
                "**Psychology Today Therapist Finder**: https://www.psychologytoday.com/therapists",
                "**BetterHelp Online Therapy**: https://www.betterhelp.com",
                "**TalkSpace Online Therapy**: https://www.talkspace.com",
                "**Anxiety & Depression Association of America (ADAA)**: https://adaa.org",
                "**Mind (UK mental health charity)**: https://www.mind.org.uk",
                "**Beyond Blue (Australia)**: https://www.beyondblue.org.au",
            ]),
        }
    }
}
