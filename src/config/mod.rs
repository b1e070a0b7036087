//! Configuration management for Sightline
//!
//! Values resolve env > TOML file > default.

mod file;

use std::path::Path;
use std::time::Duration;

pub use file::{SightlineConfigFile, config_file_path, load_config_file};

use crate::detect::Reducer;
use crate::{Error, Result};

/// Everyday objects worth announcing
const DEFAULT_RELEVANT_LABELS: &[&str] = &[
    "person",
    "chair",
    "table",
    "bottle",
    "cell phone",
    "laptop",
    "pen",
    "book",
    "keyboard",
    "mouse",
    "cup",
    "backpack",
    "tv",
    "door",
    "window",
    "stairs",
];

/// Sightline configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Camera and frame channel configuration
    pub camera: CameraConfig,

    /// Detector and aggregation configuration
    pub detection: DetectionConfig,

    /// Voice command configuration
    pub voice: VoiceConfig,

    /// Object description lookup
    pub knowledge: KnowledgeConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Camera and frame channel configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Device path (`/dev/videoN`) or `stub://name` for a synthetic source
    pub device: String,

    /// Frame width after resize
    pub width: u32,

    /// Frame height after resize
    pub height: u32,

    /// Upper bound on a single device read
    pub capture_timeout: Duration,

    /// Consecutive read failures before the device is declared unavailable
    pub max_consecutive_failures: u32,

    /// Frames held by the bounded channel
    pub channel_capacity: usize,

    /// Pause between successful captures
    pub frame_interval: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video1".to_string(),
            width: 416,
            height: 416,
            capture_timeout: Duration::from_millis(1000),
            max_consecutive_failures: 3,
            channel_capacity: 1,
            frame_interval: Duration::ZERO,
        }
    }
}

/// Detector and aggregation configuration
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Inference server URL
    pub endpoint: String,

    /// Labels that may ever be reported
    pub relevant_labels: Vec<String>,

    /// Wall-clock budget of a surroundings scan
    pub window_duration: Duration,

    /// Frame budget of a surroundings scan
    pub window_frames: usize,

    /// How per-frame counts fold across a window
    pub reducer: Reducer,

    /// How long a handler waits for a fresh frame
    pub frame_timeout: Duration,

    /// Per-request detector timeout
    pub request_timeout: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/detect".to_string(),
            relevant_labels: DEFAULT_RELEVANT_LABELS
                .iter()
                .map(ToString::to_string)
                .collect(),
            window_duration: Duration::from_secs(3),
            window_frames: 5,
            reducer: Reducer::Max,
            frame_timeout: Duration::from_millis(1500),
            request_timeout: Duration::from_millis(5000),
        }
    }
}

/// Voice command configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Phrases that wake the assistant from standby
    pub wake_phrases: Vec<String>,

    /// "What is in my hand" phrases
    pub hand_phrases: Vec<String>,

    /// "Describe my surroundings" phrases
    pub surroundings_phrases: Vec<String>,

    /// "Show the camera" phrases
    pub live_view_phrases: Vec<String>,

    /// Phrases that end the session
    pub exit_phrases: Vec<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            wake_phrases: strings(&["hey assistant"]),
            hand_phrases: strings(&["in hand", "in my hand", "what's this", "what is this"]),
            surroundings_phrases: strings(&["surrounding", "around me", "what's around"]),
            live_view_phrases: strings(&["show camera", "camera on", "live view"]),
            exit_phrases: strings(&["exit", "stop", "goodbye"]),
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "nova".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// Object description lookup configuration
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    /// Look up a short description for hand-held objects
    pub enabled: bool,

    /// Instant-answer endpoint
    pub endpoint: String,

    /// Per-request lookup timeout
    pub request_timeout: Duration,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.duckduckgo.com/".to_string(),
            request_timeout: Duration::from_millis(5000),
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper and TTS)
    pub openai: Option<String>,
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unreadable or the result is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = load_config_file(path)?;
        let config = Self::resolve(fc, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Merge a parsed config file with environment overrides
    ///
    /// `env` looks up a variable by name, so tests can supply a fixed environment.
    pub fn resolve(fc: SightlineConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        // Camera (env > index > device > default)
        let device = env("SIGHTLINE_CAMERA")
            .or_else(|| fc.camera.index.map(|i| format!("/dev/video{i}")))
            .or(fc.camera.device)
            .unwrap_or(defaults.camera.device);
        let camera = CameraConfig {
            device,
            width: fc.camera.width.unwrap_or(defaults.camera.width),
            height: fc.camera.height.unwrap_or(defaults.camera.height),
            capture_timeout: fc
                .camera
                .capture_timeout_ms
                .map_or(defaults.camera.capture_timeout, Duration::from_millis),
            max_consecutive_failures: fc
                .camera
                .max_consecutive_failures
                .unwrap_or(defaults.camera.max_consecutive_failures),
            channel_capacity: fc
                .camera
                .channel_capacity
                .unwrap_or(defaults.camera.channel_capacity),
            frame_interval: fc
                .camera
                .frame_interval_ms
                .map_or(defaults.camera.frame_interval, Duration::from_millis),
        };

        let detection = DetectionConfig {
            endpoint: env("SIGHTLINE_DETECTOR_URL")
                .or(fc.detection.endpoint)
                .unwrap_or(defaults.detection.endpoint),
            relevant_labels: fc
                .detection
                .relevant_labels
                .map(|labels| labels.iter().map(|l| l.trim().to_lowercase()).collect())
                .unwrap_or(defaults.detection.relevant_labels),
            window_duration: fc
                .detection
                .window_secs
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map_or(defaults.detection.window_duration, Duration::from_secs_f64),
            window_frames: fc
                .detection
                .window_frames
                .unwrap_or(defaults.detection.window_frames),
            reducer: fc.detection.reducer.unwrap_or(defaults.detection.reducer),
            frame_timeout: fc
                .detection
                .frame_timeout_ms
                .map_or(defaults.detection.frame_timeout, Duration::from_millis),
            request_timeout: fc
                .detection
                .request_timeout_ms
                .map_or(defaults.detection.request_timeout, Duration::from_millis),
        };

        let voice = VoiceConfig {
            wake_phrases: env("SIGHTLINE_WAKE_PHRASE")
                .map(|p| vec![p])
                .or(fc.voice.wake_phrases)
                .unwrap_or(defaults.voice.wake_phrases),
            hand_phrases: fc.voice.hand_phrases.unwrap_or(defaults.voice.hand_phrases),
            surroundings_phrases: fc
                .voice
                .surroundings_phrases
                .unwrap_or(defaults.voice.surroundings_phrases),
            live_view_phrases: fc
                .voice
                .live_view_phrases
                .unwrap_or(defaults.voice.live_view_phrases),
            exit_phrases: fc.voice.exit_phrases.unwrap_or(defaults.voice.exit_phrases),
            stt_model: env("SIGHTLINE_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.voice.stt_model),
            tts_model: env("SIGHTLINE_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.voice.tts_model),
            tts_voice: env("SIGHTLINE_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(defaults.voice.tts_voice),
            tts_speed: fc.voice.tts_speed.unwrap_or(defaults.voice.tts_speed),
        };

        let knowledge = KnowledgeConfig {
            enabled: fc.knowledge.enabled.unwrap_or(defaults.knowledge.enabled),
            endpoint: fc.knowledge.endpoint.unwrap_or(defaults.knowledge.endpoint),
            request_timeout: fc
                .knowledge
                .request_timeout_ms
                .map_or(defaults.knowledge.request_timeout, Duration::from_millis),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
        };

        Self {
            camera,
            detection,
            voice,
            knowledge,
            api_keys,
        }
    }

    /// Check invariants the pipeline relies on
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.camera.channel_capacity == 0 {
            return Err(Error::Config("camera.channel_capacity must be at least 1".to_string()));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(Error::Config("camera frame size must be non-zero".to_string()));
        }
        if self.detection.window_frames == 0 && self.detection.window_duration.is_zero() {
            return Err(Error::Config(
                "detection window needs a frame count or a duration".to_string(),
            ));
        }
        if self.voice.wake_phrases.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::Config("at least one wake phrase is required".to_string()));
        }
        if self.detection.relevant_labels.is_empty() {
            return Err(Error::Config("relevant_labels must not be empty".to_string()));
        }
        if self.knowledge.enabled && self.knowledge.request_timeout.is_zero() {
            return Err(Error::Config(
                "knowledge.request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
