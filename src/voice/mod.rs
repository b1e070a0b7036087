//! Speech input and output
//!
//! The command loop talks to a [`Listener`] and a [`Speaker`]. The production
//! pair is a microphone with Whisper STT and `OpenAI` TTS through the default
//! output device; `--text` swaps in the console.

mod capture;
mod console;
mod listener;
mod playback;
mod segmenter;
mod speaker;
mod stt;
mod tts;

use async_trait::async_trait;

pub use capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use console::{ConsoleListener, ConsoleSpeaker};
pub use listener::MicListener;
pub use playback::{AudioPlayback, decode_mp3};
pub use segmenter::{SegmenterState, UtteranceSegmenter};
pub use speaker::CloudSpeaker;
pub use stt::WhisperStt;
pub use tts::OpenAiTts;

use crate::Result;

/// Source of recognized utterances
#[async_trait(?Send)]
pub trait Listener {
    /// Wait for the next utterance
    ///
    /// # Errors
    ///
    /// [`crate::Error::InputClosed`] means no more utterances will arrive.
    /// Any other error is a failed attempt and the caller may listen again.
    async fn listen(&mut self) -> Result<String>;
}

/// Sink for spoken responses
#[async_trait(?Send)]
pub trait Speaker {
    /// Say one sentence, returning when it has been delivered
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, text: &str) -> Result<()>;
}
