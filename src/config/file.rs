//! TOML configuration file loading
//!
//! Supports `~/.config/sightline/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::detect::Reducer;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct SightlineConfigFile {
    /// Camera / frame pipeline configuration
    #[serde(default)]
    pub camera: CameraFileConfig,

    /// Detector and aggregation configuration
    #[serde(default)]
    pub detection: DetectionFileConfig,

    /// Voice command configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Object description lookup
    #[serde(default)]
    pub knowledge: KnowledgeFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Camera configuration
#[derive(Debug, Default, Deserialize)]
pub struct CameraFileConfig {
    /// Device path (e.g. "/dev/video0", "stub://desk")
    pub device: Option<String>,
    /// Camera index, shorthand for `/dev/video{index}`
    pub index: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub capture_timeout_ms: Option<u64>,
    pub max_consecutive_failures: Option<u32>,
    pub channel_capacity: Option<usize>,
    pub frame_interval_ms: Option<u64>,
}

/// Detection configuration
#[derive(Debug, Default, Deserialize)]
pub struct DetectionFileConfig {
    /// Inference server URL
    pub endpoint: Option<String>,
    /// Labels that may ever be reported
    pub relevant_labels: Option<Vec<String>>,
    pub window_secs: Option<f64>,
    pub window_frames: Option<usize>,
    pub reducer: Option<Reducer>,
    pub frame_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    pub wake_phrases: Option<Vec<String>>,
    pub hand_phrases: Option<Vec<String>>,
    pub surroundings_phrases: Option<Vec<String>>,
    pub live_view_phrases: Option<Vec<String>>,
    pub exit_phrases: Option<Vec<String>>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "nova")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// Knowledge lookup configuration
#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeFileConfig {
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. The standard path is optional:
/// returns `SightlineConfigFile::default()` if it doesn't exist or can't be parsed.
///
/// # Errors
///
/// Returns error if an explicitly given file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<SightlineConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(SightlineConfigFile::default());
    };

    if !path.exists() {
        return Ok(SightlineConfigFile::default());
    }

    let config = match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                SightlineConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            SightlineConfigFile::default()
        }
    };

    Ok(config)
}

/// Return the config file path: `~/.config/sightline/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("sightline").join("config.toml"))
}
