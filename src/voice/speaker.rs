//! Cloud TTS speaker

use async_trait::async_trait;

use super::Speaker;
use super::playback::AudioPlayback;
use super::tts::OpenAiTts;
use crate::{Error, Result};

/// Synthesizes each sentence and plays it to completion
pub struct CloudSpeaker {
    tts: OpenAiTts,
    playback: AudioPlayback,
}

impl CloudSpeaker {
    #[must_use]
    pub const fn new(tts: OpenAiTts, playback: AudioPlayback) -> Self {
        Self { tts, playback }
    }
}

#[async_trait(?Send)]
impl Speaker for CloudSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        let audio = self.tts.synthesize(text).await?;
        let playback = self.playback.clone();

        tokio::task::spawn_blocking(move || playback.play_mp3(&audio))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}
