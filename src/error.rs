//! Error types for Sightline

use thiserror::Error;

/// Result type alias for Sightline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Sightline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Camera cannot be opened or read
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// No frame arrived before the wait expired
    #[error("no frame available")]
    NoFrame,

    /// The utterance source has no more input
    #[error("input closed: {0}")]
    InputClosed(String),

    /// Speech recognition produced nothing usable
    #[error("speech not recognized: {0}")]
    Recognition(String),

    /// Object detector failure
    #[error("detection error: {0}")]
    Detection(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Description lookup error
    #[error("knowledge error: {0}")]
    Knowledge(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Image encoding or resizing error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Whether the error is a transient speech-input failure the command loop absorbs
    #[must_use]
    pub const fn is_recognition_failure(&self) -> bool {
        matches!(self, Self::Recognition(_) | Self::Stt(_))
    }

    /// Whether the error means no further utterances will arrive
    #[must_use]
    pub const fn is_end_of_input(&self) -> bool {
        matches!(self, Self::InputClosed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::Recognition("empty".to_string()).is_recognition_failure());
        assert!(Error::Stt("502".to_string()).is_recognition_failure());
        assert!(!Error::Audio("device lost".to_string()).is_recognition_failure());

        assert!(Error::InputClosed("stdin closed".to_string()).is_end_of_input());
        assert!(!Error::Audio("device lost".to_string()).is_end_of_input());
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(!Error::Io(eof).is_end_of_input());
    }
}
