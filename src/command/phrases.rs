//! Phrase tables mapping recognized speech to commands

use crate::config::VoiceConfig;

/// Intent classified from recognized text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// "What is in my hand"
    DescribeHand,
    /// "Describe my surroundings"
    DescribeSurroundings,
    /// "Show the camera"
    ShowLiveView,
    /// "Stop"
    Exit,
    /// Nothing matched
    Unrecognized,
}

/// Work a command handler performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    DescribeHand,
    DescribeSurroundings,
    ShowLiveView,
}

impl Command {
    /// The handler task for this command, if it has one
    #[must_use]
    pub const fn task(self) -> Option<Task> {
        match self {
            Self::DescribeHand => Some(Task::DescribeHand),
            Self::DescribeSurroundings => Some(Task::DescribeSurroundings),
            Self::ShowLiveView => Some(Task::ShowLiveView),
            Self::Exit | Self::Unrecognized => None,
        }
    }
}

/// Priority-ordered phrase lists
///
/// Matching is case-insensitive substring containment, checked hand →
/// surroundings → live view → exit so overlapping phrases resolve the same
/// way every time.
#[derive(Debug, Clone)]
pub struct PhraseTable {
    hand: Vec<String>,
    surroundings: Vec<String>,
    live_view: Vec<String>,
    exit: Vec<String>,
}

impl PhraseTable {
    #[must_use]
    pub fn new(
        hand: Vec<String>,
        surroundings: Vec<String>,
        live_view: Vec<String>,
        exit: Vec<String>,
    ) -> Self {
        Self {
            hand: normalize(hand),
            surroundings: normalize(surroundings),
            live_view: normalize(live_view),
            exit: normalize(exit),
        }
    }

    /// Build the table from voice configuration
    #[must_use]
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(
            config.hand_phrases.clone(),
            config.surroundings_phrases.clone(),
            config.live_view_phrases.clone(),
            config.exit_phrases.clone(),
        )
    }

    /// Classify recognized text
    #[must_use]
    pub fn classify(&self, text: &str) -> Command {
        let text = text.to_lowercase();
        let matches = |phrases: &[String]| phrases.iter().any(|p| text.contains(p.as_str()));

        if matches(&self.hand) {
            Command::DescribeHand
        } else if matches(&self.surroundings) {
            Command::DescribeSurroundings
        } else if matches(&self.live_view) {
            Command::ShowLiveView
        } else if matches(&self.exit) {
            Command::Exit
        } else {
            Command::Unrecognized
        }
    }
}

impl Default for PhraseTable {
    fn default() -> Self {
        Self::from_config(&VoiceConfig::default())
    }
}

/// Wake phrase matcher
#[derive(Debug, Clone)]
pub struct WakePhrases {
    phrases: Vec<String>,
}

impl WakePhrases {
    #[must_use]
    pub fn new(phrases: Vec<String>) -> Self {
        let phrases = normalize(phrases);
        tracing::debug!(wake_phrases = ?phrases, "wake phrases configured");
        Self { phrases }
    }

    /// Whether the transcript contains a wake phrase
    #[must_use]
    pub fn matches(&self, transcript: &str) -> bool {
        let lower = transcript.to_lowercase();
        self.phrases.iter().any(|phrase| lower.contains(phrase.as_str()))
    }

    /// Configured phrases
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// First phrase, for prompts
    #[must_use]
    pub fn primary(&self) -> &str {
        self.phrases.first().map_or("", String::as_str)
    }
}

fn normalize(phrases: Vec<String>) -> Vec<String> {
    phrases
        .into_iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_defaults() {
        let table = PhraseTable::default();
        assert_eq!(table.classify("What's in my hand?"), Command::DescribeHand);
        assert_eq!(table.classify("describe my SURROUNDINGS"), Command::DescribeSurroundings);
        assert_eq!(table.classify("turn the camera on please"), Command::ShowLiveView);
        assert_eq!(table.classify("Stop"), Command::Exit);
        assert_eq!(table.classify("sing a song"), Command::Unrecognized);
    }

    #[test]
    fn test_priority_order() {
        let table = PhraseTable::default();
        // Contains both a hand phrase and an exit phrase
        assert_eq!(table.classify("stop, what is in hand"), Command::DescribeHand);
        // Surroundings before exit
        assert_eq!(table.classify("exit the surroundings scan"), Command::DescribeSurroundings);
    }

    #[test]
    fn test_wake_matches() {
        let wake = WakePhrases::new(vec!["  Hey Assistant ".to_string()]);
        assert_eq!(wake.phrases(), &["hey assistant"]);
        assert!(wake.matches("Hey Assistant, hello"));
        assert!(wake.matches("well HEY ASSISTANT"));
        assert!(!wake.matches("hello there"));
    }

    #[test]
    fn test_empty_phrases_dropped() {
        let wake = WakePhrases::new(vec![String::new(), "ok".to_string()]);
        assert_eq!(wake.primary(), "ok");
    }
}
