//! Single-shot and windowed detection over the frame channel

use std::sync::Arc;
use std::time::Duration;

use super::{
    AggregateResult, AllowList, Detection, DetectionWindow, Detector, FrameCounts, Reducer,
    Sighting, pick_prominent,
};
use crate::Error;
use crate::config::DetectionConfig;
use crate::vision::{Frame, FrameChannel};

/// Outcome of a single-shot detection
#[derive(Debug, Clone, PartialEq)]
pub enum SingleShot {
    /// An allowed object was found
    Found(Sighting),
    /// A frame was analysed but nothing allowed was in it
    Empty,
    /// No frame arrived in time
    NoFrame,
    /// The camera is gone
    NoVisualData,
}

/// Outcome of a windowed detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Survey {
    /// At least one frame was analysed; the result may be empty
    Seen(AggregateResult),
    /// No frame arrived during the window
    NoFrame,
    /// The camera is gone
    NoVisualData,
}

/// Runs the detector over frames drawn from the channel
pub struct Aggregator {
    detector: Arc<dyn Detector>,
    allow: AllowList,
    window_frames: usize,
    window_duration: Duration,
    reducer: Reducer,
    frame_timeout: Duration,
}

impl Aggregator {
    #[must_use]
    pub fn new(detector: Arc<dyn Detector>, config: &DetectionConfig) -> Self {
        Self {
            detector,
            allow: AllowList::new(&config.relevant_labels),
            window_frames: config.window_frames,
            window_duration: config.window_duration,
            reducer: config.reducer,
            frame_timeout: config.frame_timeout,
        }
    }

    #[must_use]
    pub const fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    /// Detect the most prominent object in one fresh frame
    pub async fn single_shot(&self, channel: &FrameChannel) -> SingleShot {
        let frame = match channel.take_timeout(self.frame_timeout).await {
            Ok(frame) => frame,
            Err(Error::DeviceUnavailable(_)) => return SingleShot::NoVisualData,
            Err(e) => {
                tracing::warn!(error = %e, "no frame for single-shot detection");
                return SingleShot::NoFrame;
            }
        };

        let detections = self.detect(&frame).await;
        match pick_prominent(&detections, &self.allow) {
            Some(sighting) => {
                tracing::info!(
                    label = %sighting.label,
                    count = sighting.count,
                    confidence = sighting.confidence,
                    "single-shot sighting"
                );
                SingleShot::Found(sighting)
            }
            None => SingleShot::Empty,
        }
    }

    /// Aggregate detections over a frame/time window
    pub async fn survey(&self, channel: &FrameChannel) -> Survey {
        let mut window = DetectionWindow::new(self.window_frames, self.window_duration);
        let mut processed = 0usize;
        let mut device_lost = false;

        while !window.is_complete() {
            let wait = window
                .remaining()
                .map_or(self.frame_timeout, |left| left.min(self.frame_timeout));
            if wait.is_zero() {
                break;
            }

            let frame = match channel.take_timeout(wait).await {
                Ok(frame) => frame,
                Err(Error::DeviceUnavailable(_)) => {
                    device_lost = true;
                    break;
                }
                Err(_) => {
                    // Nothing this round; the window budget decides when to give up
                    if window.remaining().is_none() {
                        break;
                    }
                    continue;
                }
            };

            let detections = self.detect(&frame).await;
            let counts = FrameCounts::from_detections(&detections, &self.allow);
            tracing::trace!(sequence = frame.sequence(), labels = ?counts, "window frame");
            window.push(counts);
            processed += 1;
        }

        if processed == 0 {
            return if device_lost || channel.is_closed() {
                Survey::NoVisualData
            } else {
                Survey::NoFrame
            };
        }

        let result = window.aggregate(self.reducer);
        tracing::info!(frames = processed, labels = result.len(), "survey complete");
        Survey::Seen(result)
    }

    /// Run the detector once, treating failures as an empty frame
    pub async fn detect(&self, frame: &Frame) -> Vec<Detection> {
        match self.detector.detect(frame).await {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!(
                    detector = self.detector.name(),
                    sequence = frame.sequence(),
                    error = %e,
                    "detection failed"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use async_trait::async_trait;

    use super::*;
    use crate::Result;

    /// Replays one detection list per call
    struct Scripted {
        frames: Mutex<Vec<Vec<Detection>>>,
    }

    #[async_trait]
    impl Detector for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>> {
            let mut frames = self.frames.lock().unwrap();
            if frames.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(frames.remove(0))
            }
        }
    }

    fn aggregator(frames: Vec<Vec<Detection>>, config: &DetectionConfig) -> Aggregator {
        Aggregator::new(
            Arc::new(Scripted {
                frames: Mutex::new(frames),
            }),
            config,
        )
    }

    fn config() -> DetectionConfig {
        DetectionConfig {
            relevant_labels: vec!["pen".to_string(), "bottle".to_string()],
            frame_timeout: Duration::from_millis(50),
            window_duration: Duration::ZERO,
            window_frames: 2,
            ..DetectionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_single_shot_without_frame() {
        let channel = FrameChannel::new(1);
        let agg = aggregator(vec![], &config());
        assert_eq!(agg.single_shot(&channel).await, SingleShot::NoFrame);
    }

    #[tokio::test]
    async fn test_single_shot_closed_channel() {
        let channel = FrameChannel::new(1);
        channel.close();
        let agg = aggregator(vec![], &config());
        assert_eq!(agg.single_shot(&channel).await, SingleShot::NoVisualData);
    }

    #[tokio::test]
    async fn test_single_shot_empty() {
        let channel = FrameChannel::new(1);
        channel.publish(Frame::blank(8, 8, 1));
        let agg = aggregator(vec![vec![Detection::new("dog", 0.9)]], &config());
        assert_eq!(agg.single_shot(&channel).await, SingleShot::Empty);
    }

    #[tokio::test]
    async fn test_survey_without_frames() {
        let channel = FrameChannel::new(1);
        let mut cfg = config();
        cfg.window_duration = Duration::from_millis(100);
        let agg = aggregator(vec![], &cfg);
        assert_eq!(agg.survey(&channel).await, Survey::NoFrame);
    }

    /// Takes 10 ms per frame and always sees a bottle
    struct Slow {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Detector for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(vec![Detection::new("bottle", 0.9)])
        }
    }

    #[tokio::test]
    async fn test_survey_stops_at_time_budget() {
        let channel = Arc::new(FrameChannel::new(2));
        let publisher = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                for sequence in 0.. {
                    if channel.is_closed() {
                        break;
                    }
                    channel.publish(Frame::blank(8, 8, sequence));
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
            })
        };

        let cfg = DetectionConfig {
            window_frames: 50,
            window_duration: Duration::from_millis(200),
            ..config()
        };
        let detector = Arc::new(Slow {
            calls: AtomicUsize::new(0),
        });
        let agg = Aggregator::new(detector.clone(), &cfg);

        let started = Instant::now();
        let survey = agg.survey(&channel).await;
        let elapsed = started.elapsed();
        channel.close();
        publisher.await.unwrap();

        let Survey::Seen(result) = survey else {
            panic!("expected frames to be seen, got {survey:?}");
        };
        assert_eq!(result.get("bottle"), Some(1));
        assert!(elapsed < cfg.window_duration + cfg.frame_timeout, "took {elapsed:?}");
        let calls = detector.calls.load(Ordering::SeqCst);
        assert!(calls > 0 && calls < 50, "detector ran {calls} times");
    }
}
