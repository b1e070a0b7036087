//! Microphone listener: capture, segment, transcribe

use std::time::Duration;

use async_trait::async_trait;

use super::Listener;
use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::segmenter::UtteranceSegmenter;
use super::stt::WhisperStt;
use crate::{Error, Result};

/// Poll interval for draining the capture buffer (1600 samples)
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Listens on the default microphone and transcribes one utterance per call
pub struct MicListener {
    capture: AudioCapture,
    segmenter: UtteranceSegmenter,
    stt: WhisperStt,
}

impl MicListener {
    #[must_use]
    pub const fn new(capture: AudioCapture, stt: WhisperStt) -> Self {
        Self {
            capture,
            segmenter: UtteranceSegmenter::new(),
            stt,
        }
    }
}

#[async_trait(?Send)]
impl Listener for MicListener {
    async fn listen(&mut self) -> Result<String> {
        self.capture
            .start()
            .map_err(|e| Error::Recognition(format!("microphone unavailable: {e}")))?;
        // Drop anything recorded while we were speaking
        self.capture.clear();
        self.segmenter.reset();

        let mut interval = tokio::time::interval(POLL_INTERVAL);
        let segment = loop {
            interval.tick().await;
            let chunk = self.capture.drain();
            if !chunk.is_empty() && self.segmenter.process(&chunk) {
                break self.segmenter.take();
            }
        };

        tracing::debug!(samples = segment.len(), "transcribing utterance");
        let wav = samples_to_wav(&segment, SAMPLE_RATE)
            .map_err(|e| Error::Recognition(format!("utterance encoding failed: {e}")))?;
        let text = self.stt.transcribe(&wav).await?;

        if text.is_empty() {
            return Err(Error::Recognition("empty transcript".to_string()));
        }
        Ok(text)
    }
}
