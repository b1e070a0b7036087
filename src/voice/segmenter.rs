//! Energy-based utterance segmentation
//!
//! Splits the microphone stream into utterances so each one can be sent to
//! STT on its own: speech starts when RMS energy rises above a threshold and
//! ends after a run of silence.

use super::capture::{SAMPLE_RATE, rms};

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (0.3 s)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Silence that ends an utterance (0.5 s)
const SILENCE_SAMPLES: usize = 8000;

/// Longest utterance kept before the segment is forced closed (15 s)
const MAX_SEGMENT_SAMPLES: usize = SAMPLE_RATE as usize * 15;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Speech in progress, accumulating
    Listening,
}

/// Accumulates speech between silences
#[derive(Debug)]
pub struct UtteranceSegmenter {
    state: SegmenterState,
    buffer: Vec<f32>,
    speech: usize,
    silence: usize,
}

impl UtteranceSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            buffer: Vec::new(),
            speech: 0,
            silence: 0,
        }
    }

    /// Feed a block of samples
    ///
    /// Returns true once an utterance is complete and ready to take.
    pub fn process(&mut self, samples: &[f32]) -> bool {
        let energy = rms(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Listening;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.speech = samples.len();
                    self.silence = 0;
                    tracing::trace!(energy, "speech started");
                }
                false
            }
            SegmenterState::Listening => {
                self.buffer.extend_from_slice(samples);
                if is_speech {
                    self.speech += samples.len();
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.is_complete() {
                    tracing::debug!(samples = self.buffer.len(), "utterance complete");
                    return true;
                }

                // Too much silence without enough speech: a cough, a door
                if self.silence > SILENCE_SAMPLES * 2 {
                    tracing::trace!("segment abandoned");
                    self.reset();
                }
                false
            }
        }
    }

    /// Whether the current segment is ready
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SegmenterState::Listening
            && ((self.silence > SILENCE_SAMPLES && self.speech > MIN_SPEECH_SAMPLES)
                || self.buffer.len() >= MAX_SEGMENT_SAMPLES)
    }

    /// Take the segment and return to idle
    pub fn take(&mut self) -> Vec<f32> {
        let segment = std::mem::take(&mut self.buffer);
        self.reset();
        segment
    }

    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.buffer.clear();
        self.speech = 0;
        self.silence = 0;
    }

    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = 1600;

    fn loud() -> Vec<f32> {
        vec![0.2; CHUNK]
    }

    fn quiet() -> Vec<f32> {
        vec![0.0; CHUNK]
    }

    #[test]
    fn test_silence_stays_idle() {
        let mut segmenter = UtteranceSegmenter::new();
        for _ in 0..20 {
            assert!(!segmenter.process(&quiet()));
        }
        assert_eq!(segmenter.state(), SegmenterState::Idle);
        assert!(segmenter.take().is_empty());
    }

    #[test]
    fn test_speech_then_silence_completes() {
        let mut segmenter = UtteranceSegmenter::new();
        for _ in 0..5 {
            assert!(!segmenter.process(&loud()));
        }
        assert_eq!(segmenter.state(), SegmenterState::Listening);

        let mut complete = false;
        for _ in 0..10 {
            if segmenter.process(&quiet()) {
                complete = true;
                break;
            }
        }
        assert!(complete);

        let segment = segmenter.take();
        assert!(segment.len() > MIN_SPEECH_SAMPLES);
        assert_eq!(segmenter.state(), SegmenterState::Idle);
        assert!(segmenter.take().is_empty());
    }

    #[test]
    fn test_short_blip_abandoned() {
        let mut segmenter = UtteranceSegmenter::new();
        // 100 ms of noise is under the minimum speech length
        segmenter.process(&vec![0.2; 1600]);
        for _ in 0..20 {
            assert!(!segmenter.process(&quiet()));
        }
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_reset() {
        let mut segmenter = UtteranceSegmenter::new();
        segmenter.process(&loud());
        segmenter.reset();
        assert_eq!(segmenter.state(), SegmenterState::Idle);
        assert!(!segmenter.is_complete());
        assert!(segmenter.take().is_empty());
    }
}
