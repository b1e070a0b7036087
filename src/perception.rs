//! Perception loop
//!
//! Runs on a blocking worker: pulls frames from the camera and publishes them
//! into the frame channel until told to stop or until the device is declared
//! unavailable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::Error;
use crate::config::CameraConfig;
use crate::vision::{FrameChannel, FrameSource};

/// Pause after a failed read before trying again
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Health of the perception loop, observed by the command loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerceptionStatus {
    /// Connecting to the camera
    Starting,
    /// Publishing frames
    Running,
    /// Camera declared unavailable; no more frames will arrive
    Failed,
    /// Stopped on request
    Stopped,
}

impl PerceptionStatus {
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Capture frames until `stop` is raised or the camera gives up
///
/// Blocking; run it on `tokio::task::spawn_blocking`. The source is dropped
/// on return, releasing the device.
pub fn run<S: FrameSource>(
    mut source: S,
    channel: &FrameChannel,
    stop: &AtomicBool,
    status: &watch::Sender<PerceptionStatus>,
    config: &CameraConfig,
) -> PerceptionStatus {
    let max_failures = config.max_consecutive_failures.max(1);
    let mut failures = 0u32;
    let mut connected = false;
    let mut last_error = None;

    status.send_replace(PerceptionStatus::Starting);
    tracing::info!(camera = source.name(), "perception loop started");

    while !stop.load(Ordering::Acquire) {
        let result = if connected {
            source.next_frame().map(Some)
        } else {
            source.connect().map(|()| None)
        };

        match result {
            Ok(Some(frame)) => {
                failures = 0;
                tracing::trace!(sequence = frame.sequence(), "frame captured");
                channel.publish(frame);

                if !config.frame_interval.is_zero() {
                    std::thread::sleep(config.frame_interval);
                }
            }
            Ok(None) => {
                connected = true;
                failures = 0;
                status.send_replace(PerceptionStatus::Running);
            }
            Err(e) => {
                failures += 1;
                tracing::debug!(error = %e, failures, "camera read failed");
                last_error = Some(e);

                if failures >= max_failures {
                    return give_up(source.name(), last_error, channel, status);
                }
                std::thread::sleep(RETRY_DELAY.min(config.capture_timeout));
            }
        }
    }

    tracing::info!(stats = ?channel.stats(), "perception loop stopped");
    status.send_replace(PerceptionStatus::Stopped);
    PerceptionStatus::Stopped
}

fn give_up(
    camera: &str,
    last_error: Option<Error>,
    channel: &FrameChannel,
    status: &watch::Sender<PerceptionStatus>,
) -> PerceptionStatus {
    let error = match last_error {
        Some(e @ Error::DeviceUnavailable(_)) => e,
        Some(e) => Error::DeviceUnavailable(e.to_string()),
        None => Error::DeviceUnavailable(camera.to_string()),
    };
    tracing::error!(camera, error = %error, "camera unavailable, continuing without vision");

    // Status first, so a consumer woken by the close already sees Failed
    status.send_replace(PerceptionStatus::Failed);
    channel.close();
    PerceptionStatus::Failed
}

/// Handles shared between the perception worker and its owner
#[derive(Debug, Clone)]
pub struct PerceptionHandle {
    stop: Arc<AtomicBool>,
    status: watch::Receiver<PerceptionStatus>,
}

impl PerceptionHandle {
    /// Create the stop flag and status channel for one perception run
    #[must_use]
    pub fn new() -> (Self, watch::Sender<PerceptionStatus>) {
        let (tx, rx) = watch::channel(PerceptionStatus::Starting);
        (
            Self {
                stop: Arc::new(AtomicBool::new(false)),
                status: rx,
            },
            tx,
        )
    }

    /// Ask the loop to finish its in-flight read and exit
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Latest status
    #[must_use]
    pub fn status(&self) -> PerceptionStatus {
        *self.status.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::vision::Frame;

    /// Fails every read after `good` successful ones
    struct Flaky {
        good: u64,
        sequence: u64,
    }

    impl FrameSource for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn connect(&mut self) -> Result<()> {
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Frame> {
            if self.sequence >= self.good {
                return Err(Error::DeviceUnavailable("flaky: read failed".to_string()));
            }
            self.sequence += 1;
            Ok(Frame::blank(4, 4, self.sequence))
        }
    }

    fn config() -> CameraConfig {
        CameraConfig {
            device: "stub://test".to_string(),
            width: 4,
            height: 4,
            ..CameraConfig::default()
        }
    }

    #[test]
    fn test_gives_up_after_consecutive_failures() {
        let channel = FrameChannel::new(1);
        let (handle, tx) = PerceptionHandle::new();
        let source = Flaky { good: 2, sequence: 0 };

        let outcome = run(source, &channel, &handle.stop_flag(), &tx, &config());

        assert_eq!(outcome, PerceptionStatus::Failed);
        assert_eq!(handle.status(), PerceptionStatus::Failed);
        assert!(channel.is_closed());
        assert_eq!(channel.stats().published, 2);
        // The last good frame is still readable
        assert_eq!(channel.try_take().map(|f| f.sequence()), Some(2));
    }

    #[test]
    fn test_stop_flag_ends_loop() {
        let channel = Arc::new(FrameChannel::new(1));
        let (handle, tx) = PerceptionHandle::new();
        let stop = handle.stop_flag();

        let worker = {
            let channel = Arc::clone(&channel);
            std::thread::spawn(move || {
                let source = Flaky { good: u64::MAX, sequence: 0 };
                let config = CameraConfig {
                    frame_interval: Duration::from_millis(1),
                    ..config()
                };
                run(source, &channel, &stop, &tx, &config)
            })
        };

        while channel.stats().published < 3 {
            std::thread::sleep(Duration::from_millis(1));
        }
        handle.stop();

        assert_eq!(worker.join().unwrap(), PerceptionStatus::Stopped);
        assert_eq!(handle.status(), PerceptionStatus::Stopped);
        assert!(!channel.is_closed());
    }
}
