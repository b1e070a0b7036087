//! Spoken responses
//!
//! Formatting is pure; [`Responder`] owns the speaker and sends each sentence
//! to it exactly once.

use crate::Result;
use crate::detect::{AggregateResult, Sighting, SingleShot, Survey};
use crate::voice::Speaker;

pub const ACKNOWLEDGE: &str = "How can I assist you?";
pub const CLARIFY: &str = "I didn't understand that. Please try again.";
pub const REQUEST_REPEAT: &str = "I couldn't understand. Please repeat.";
pub const FAREWELL: &str = "Goodbye!";
pub const NOTHING_AROUND: &str = "I don't see any familiar objects around.";
pub const NOTHING_IN_HAND: &str = "I couldn't detect any object in your hand.";
pub const CAPTURE_FAILED: &str = "Failed to capture an image.";
pub const NOTHING_SEEN: &str = "I couldn't see anything just now.";
pub const NO_VISUAL_DATA: &str = "I have no visual data right now.";
pub const DEGRADED: &str = "The camera is unavailable, so I have no visual data.";
pub const LIVE_VIEW: &str = "Showing the live camera view.";
pub const KNOWLEDGE_FALLBACK: &str = "I couldn't retrieve information at the moment.";

/// Standby prompt naming the wake phrase
#[must_use]
pub fn standby_greeting(wake: &str) -> String {
    format!("I'm in standby mode. Say '{wake}' to activate.")
}

/// "I see 1 bottle and 2 chair around you."
#[must_use]
pub fn describe_aggregate(result: &AggregateResult) -> String {
    let items: Vec<String> = result
        .iter()
        .map(|(label, count)| format!("{count} {label}"))
        .collect();

    match items.as_slice() {
        [] => NOTHING_AROUND.to_string(),
        [only] => format!("I see {only} around you."),
        [head @ .., last] => format!("I see {} and {last} around you.", head.join(", ")),
    }
}

/// "You are holding a pen." plus the description, if any
#[must_use]
pub fn describe_sighting(sighting: &Sighting, description: Option<&str>) -> String {
    let sentence = format!("You are holding a {}.", sighting.label);
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => format!("{sentence} {description}"),
        None => sentence,
    }
}

/// Sentence for a single-shot outcome
#[must_use]
pub fn describe_hand(outcome: &SingleShot, description: Option<&str>) -> String {
    match outcome {
        SingleShot::Found(sighting) => describe_sighting(sighting, description),
        SingleShot::Empty => NOTHING_IN_HAND.to_string(),
        SingleShot::NoFrame | SingleShot::NoVisualData => CAPTURE_FAILED.to_string(),
    }
}

/// Sentence for a survey outcome
#[must_use]
pub fn describe_survey(outcome: &Survey) -> String {
    match outcome {
        Survey::Seen(result) => describe_aggregate(result),
        Survey::NoFrame => NOTHING_SEEN.to_string(),
        Survey::NoVisualData => NO_VISUAL_DATA.to_string(),
    }
}

/// Serializes sentences onto a speaker
pub struct Responder<S> {
    speaker: S,
}

impl<S: Speaker> Responder<S> {
    pub const fn new(speaker: S) -> Self {
        Self { speaker }
    }

    /// Speak one sentence
    ///
    /// # Errors
    ///
    /// Returns the speaker's error; the sentence is not retried
    pub async fn say(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            tracing::warn!("refusing to speak an empty response");
            return Ok(());
        }

        tracing::info!(response = text, "speaking");
        self.speaker.speak(text).await
    }

    pub fn into_inner(self) -> S {
        self.speaker
    }
}
