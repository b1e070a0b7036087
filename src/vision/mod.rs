//! Vision input
//!
//! Camera sources, captured frames, and the bounded channel that carries
//! frames from the perception loop to command handlers.

mod camera;
mod channel;
mod frame;

pub use camera::{CameraSource, FrameSource};
pub use channel::{ChannelStats, FrameChannel};
pub use frame::Frame;
