//! Sightline - a voice-driven visual assistant
//!
//! This library provides the core functionality for Sightline:
//! - Camera capture into a bounded, drop-oldest frame channel
//! - Object detection over single frames and short windows
//! - Voice command interpretation (wake phrase, tasks, exit)
//! - Spoken responses via STT/TTS
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   frames   ┌──────────────┐
//! │  Perception  │──────────▶ │ FrameChannel │  capacity N, drop-oldest
//! │ (blocking)   │            └──────┬───────┘
//! └──────────────┘                   │ freshest frame
//!                                    ▼
//! ┌──────────────┐  action   ┌──────────────┐  sentence  ┌──────────────┐
//! │ Interpreter  │─────────▶ │  Aggregator  │──────────▶ │  Responder   │
//! │ (standby →   │           │ single-shot  │            │  → Speaker   │
//! │  active → ⏹) │           │ / survey     │            └──────────────┘
//! └──────▲───────┘           └──────────────┘
//!        │ utterance
//! ┌──────┴───────┐
//! │   Listener   │
//! └──────────────┘
//! ```

pub mod command;
pub mod config;
pub mod daemon;
pub mod detect;
pub mod error;
pub mod knowledge;
pub mod perception;
pub mod response;
pub mod vision;
pub mod voice;

pub use config::Config;
pub use daemon::{CommandLoop, Daemon, Pipeline, run_session};
pub use error::{Error, Result};
