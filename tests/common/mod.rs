//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use sightline::config::{CameraConfig, DetectionConfig};
use sightline::detect::{Detection, Detector};
use sightline::knowledge::DescriptionLookup;
use sightline::vision::{Frame, FrameSource};
use sightline::voice::{Listener, Speaker};
use sightline::{Config, Error, Result};

/// Plays back a fixed script, then reports closed input
pub struct ScriptedListener {
    script: VecDeque<std::result::Result<String, Error>>,
}

impl ScriptedListener {
    /// Each line is one recognized utterance
    pub fn new(lines: &[&str]) -> Self {
        Self {
            script: lines.iter().map(|l| Ok((*l).to_string())).collect(),
        }
    }

    /// Insert a recognition failure at the end of the script so far
    #[must_use]
    pub fn then_garbled(mut self) -> Self {
        self.script.push_back(Err(Error::Recognition("garbled".to_string())));
        self
    }

    /// Insert an arbitrary listen error
    #[must_use]
    pub fn then_error(mut self, error: Error) -> Self {
        self.script.push_back(Err(error));
        self
    }

    #[must_use]
    pub fn then(mut self, line: &str) -> Self {
        self.script.push_back(Ok(line.to_string()));
        self
    }
}

#[async_trait(?Send)]
impl Listener for ScriptedListener {
    async fn listen(&mut self) -> Result<String> {
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(Error::InputClosed("script exhausted".to_string())))
    }
}

/// Records every sentence spoken
#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl Speaker for RecordingSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Returns one scripted detection list per call, repeating the last
pub struct ScriptedDetector {
    frames: Mutex<VecDeque<Vec<Detection>>>,
    last: Mutex<Vec<Detection>>,
    calls: Mutex<usize>,
}

impl ScriptedDetector {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            frames: Mutex::new(frames.into()),
            last: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        }
    }

    /// Same detections for every frame
    pub fn constant(detections: Vec<Detection>) -> Self {
        Self::new(vec![detections])
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>> {
        *self.calls.lock().unwrap() += 1;
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.frames.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

/// Fixed description for every label
pub struct FixedLookup(pub Option<String>);

#[async_trait]
impl DescriptionLookup for FixedLookup {
    async fn lookup(&self, _label: &str) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Lookup service that is always unreachable
pub struct FailingLookup;

#[async_trait]
impl DescriptionLookup for FailingLookup {
    async fn lookup(&self, _label: &str) -> Result<Option<String>> {
        Err(Error::Knowledge("service unreachable".to_string()))
    }
}

/// Camera that fails every read
pub struct FailingCamera {
    pub reads: Arc<Mutex<u32>>,
}

impl FailingCamera {
    pub fn new() -> Self {
        Self {
            reads: Arc::new(Mutex::new(0)),
        }
    }
}

impl FrameSource for FailingCamera {
    fn name(&self) -> &str {
        "failing"
    }

    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        *self.reads.lock().unwrap() += 1;
        Err(Error::DeviceUnavailable("failing: read failed".to_string()))
    }
}

/// Camera producing small blank frames every few milliseconds
pub struct TickingCamera {
    sequence: u64,
}

impl TickingCamera {
    pub const fn new() -> Self {
        Self { sequence: 0 }
    }
}

impl FrameSource for TickingCamera {
    fn name(&self) -> &str {
        "ticking"
    }

    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        std::thread::sleep(Duration::from_millis(5));
        self.sequence += 1;
        Ok(Frame::blank(8, 8, self.sequence))
    }
}

/// Config tuned for fast tests
pub fn test_config() -> Config {
    Config {
        camera: CameraConfig {
            device: "stub://test".to_string(),
            width: 8,
            height: 8,
            ..CameraConfig::default()
        },
        detection: DetectionConfig {
            window_frames: 3,
            window_duration: Duration::from_secs(2),
            frame_timeout: Duration::from_millis(500),
            ..DetectionConfig::default()
        },
        ..Config::default()
    }
}

pub fn det(label: &str, confidence: f32) -> Detection {
    Detection::new(label, confidence)
}
