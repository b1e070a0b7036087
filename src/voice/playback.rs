//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// OpenAI TTS MP3 output rate
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays mono samples on the default output device
#[derive(Clone)]
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// # Errors
    ///
    /// Returns error if no output device supports 24kHz
    pub fn new() -> Result<Self> {
        let device = output_device()?;
        let rate = SampleRate(PLAYBACK_SAMPLE_RATE);

        let supported = [1, 2]
            .into_iter()
            .find_map(|channels| {
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == channels
                        && c.min_sample_rate() <= rate
                        && c.max_sample_rate() >= rate
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported.with_sample_rate(rate).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Decode and play MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3(&self, mp3: &[u8]) -> Result<()> {
        let samples = decode_mp3(mp3)?;
        self.play(samples)
    }

    /// Play samples, blocking until done
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built
    pub fn play(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let channels = usize::from(self.config.channels);
        let total = samples.len();
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = {
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            output_device()?
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut pos = position.load(Ordering::Relaxed);
                        for frame in data.chunks_mut(channels) {
                            let sample = samples.get(pos).copied().unwrap_or(0.0);
                            frame.fill(sample);
                            pos = (pos + 1).min(total);
                        }
                        position.store(pos, Ordering::Relaxed);
                        if pos >= total {
                            finished.store(true, Ordering::Release);
                        }
                    },
                    |err| tracing::error!(error = %err, "audio playback error"),
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let expected = Duration::from_millis(total as u64 * 1000 / u64::from(PLAYBACK_SAMPLE_RATE));
        let deadline = Instant::now() + expected + Duration::from_millis(500);

        while !finished.load(Ordering::Acquire) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }

        // Let the device flush its last buffer
        std::thread::sleep(Duration::from_millis(100));
        drop(stream);

        tracing::debug!(samples = total, "playback complete");
        Ok(())
    }

    /// Play a short test tone
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    pub fn play_tone(&self, frequency: f32, duration: Duration) -> Result<()> {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let samples = {
            let count = (duration.as_secs_f32() * PLAYBACK_SAMPLE_RATE as f32) as usize;
            (0..count)
                .map(|i| {
                    let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
                    0.2 * (2.0 * std::f32::consts::PI * frequency * t).sin()
                })
                .collect()
        };
        self.play(samples)
    }
}

fn output_device() -> Result<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error on malformed MP3 data
pub fn decode_mp3(mp3: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let channels = frame.channels.max(1);
                samples.extend(frame.data.chunks(channels).map(|chunk| {
                    #[allow(clippy::cast_precision_loss)]
                    let mean = chunk.iter().map(|&s| f32::from(s) / 32768.0).sum::<f32>()
                        / chunk.len() as f32;
                    mean
                }));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_mp3() {
        assert!(decode_mp3(&[]).unwrap().is_empty());
    }
}
