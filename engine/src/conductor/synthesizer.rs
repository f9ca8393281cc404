//! Conductor Synthesizer
//!
//! Merges the scratch entries of a run into one final document. Entries are
//! concatenated under `--- key ---` headers and handed to the model; if the
//! model call fails the labelled raw concatenation is returned instead.

use crate::llm::router::LLMRouter;
use crate::llm::Message;
use std::sync::Arc;
use tracing::{info, warn};

/// Label on reports assembled without a model call
pub const UNSYNTHESIZED_LABEL: &str = "[UNSYNTHESIZED FALLBACK]";

/// Synthesizer output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub text: String,
    /// True when the raw concatenation was returned
    pub fallback: bool,
}

pub struct Synthesizer {
    router: Arc<LLMRouter>,
}

/// Concatenate entries with their keys as section headers
pub fn concatenate(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(key, content)| format!("--- {} ---\n{}", key, content.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Deterministic report used when no model synthesis is possible
pub fn fallback_report(goal: &str, entries: &[(String, String)]) -> String {
    if entries.is_empty() {
        return format!(
            "{} No results were recorded for: {}",
            UNSYNTHESIZED_LABEL, goal
        );
    }
    format!(
        "{} Raw results for: {}\n\n{}",
        UNSYNTHESIZED_LABEL,
        goal,
        concatenate(entries)
    )
}

impl Synthesizer {
    pub fn new(router: Arc<LLMRouter>) -> Self {
        Self { router }
    }

    pub async fn synthesize(&self, goal: &str, entries: &[(String, String)]) -> Synthesis {
        if entries.is_empty() {
            warn!("Nothing to synthesize");
            return Synthesis {
                text: fallback_report(goal, entries),
                fallback: true,
            };
        }

        let system = Message::system(
            "You are the Synthesizer. Merge the partial results below into one coherent, \
            well-structured final document for the stated goal. Keep every concrete fact, \
            remove repetition, and mention any step that is marked as failed.",
        );
        let user = Message::user(format!(
            "Goal: {}\n\nPartial results:\n\n{}",
            goal,
            concatenate(entries)
        ));

        match self.router.generate_text(vec![system, user]).await {
            Ok(text) if !text.trim().is_empty() => {
                info!("Synthesized {} entries", entries.len());
                Synthesis {
                    text,
                    fallback: false,
                }
            }
            Ok(_) => {
                warn!("Synthesis returned an empty document, using raw results");
                Synthesis {
                    text: fallback_report(goal, entries),
                    fallback: true,
                }
            }
            Err(e) => {
                warn!("Synthesis failed ({}), using raw results", e);
                Synthesis {
                    text: fallback_report(goal, entries),
                    fallback: true,
                }
            }
        }
    }
}
