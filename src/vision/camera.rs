//! Camera frame sources
//!
//! `CameraSource` picks a backend from the configured device:
//! - `stub://name`: synthetic frames for tests and headless runs
//! - `stub://fail`: a device whose every read fails
//! - `/dev/videoN`: a V4L2 device (feature: `camera-v4l2`)
//!
//! Sources do not retry: a failed read is returned to the perception loop,
//! which decides when the device is gone for good.

use std::time::Duration;

use crate::config::CameraConfig;
use crate::vision::Frame;
use crate::{Error, Result};

/// Synthetic sources pace themselves like a 30 fps device
const SYNTHETIC_FRAME_PERIOD: Duration = Duration::from_millis(33);

/// Anything that produces camera frames
pub trait FrameSource: Send {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// Open the underlying device
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the device cannot be opened
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame, bounded by the configured capture timeout
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the read fails
    fn next_frame(&mut self) -> Result<Frame>;
}

/// Camera backed by a synthetic generator or a real device
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "camera-v4l2")]
    Device(v4l2::DeviceCamera),
}

impl CameraSource {
    /// Choose a backend for the configured device
    ///
    /// # Errors
    ///
    /// Returns error if the device path needs a backend that was not compiled in
    pub fn open(config: &CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            });
        }

        #[cfg(feature = "camera-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(v4l2::DeviceCamera::new(config)),
            })
        }
        #[cfg(not(feature = "camera-v4l2"))]
        {
            Err(Error::Config(format!(
                "camera {} requires the camera-v4l2 feature",
                config.device
            )))
        }
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> &str {
        match &self.backend {
            CameraBackend::Synthetic(camera) => &camera.device,
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.device(),
        }
    }

    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.connect(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.next_frame(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.next_frame(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://)
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    device: String,
    width: u32,
    height: u32,
    failing: bool,
    connected: bool,
    sequence: u64,
}

impl SyntheticCamera {
    fn new(config: &CameraConfig) -> Self {
        Self {
            failing: config.device == "stub://fail",
            device: config.device.clone(),
            width: config.width,
            height: config.height,
            connected: false,
            sequence: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        tracing::info!(device = %self.device, "camera connected (synthetic)");
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(Error::DeviceUnavailable(format!("{} not connected", self.device)));
        }
        if self.failing {
            return Err(Error::DeviceUnavailable(format!("{}: read failed", self.device)));
        }

        std::thread::sleep(SYNTHETIC_FRAME_PERIOD);
        self.sequence += 1;
        Ok(Frame::blank(self.width, self.height, self.sequence))
    }
}

// ----------------------------------------------------------------------------
// V4L2 device source
// ----------------------------------------------------------------------------

#[cfg(feature = "camera-v4l2")]
#[allow(unsafe_code)] // self_referencing expands to unsafe accessors
mod v4l2 {
    use ouroboros::self_referencing;
    use v4l::buffer::Type;
    use v4l::io::traits::CaptureStream;
    use v4l::prelude::MmapStream;
    use v4l::video::Capture;

    use crate::config::CameraConfig;
    use crate::vision::Frame;
    use crate::{Error, Result};

    #[self_referencing]
    struct DeviceState {
        device: v4l::Device,
        #[borrows(mut device)]
        #[covariant]
        stream: MmapStream<'this, v4l::Device>,
    }

    /// Pixel layout negotiated with the driver
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum PixelLayout {
        Rgb24,
        Mjpeg,
    }

    pub(super) struct DeviceCamera {
        config: CameraConfig,
        state: Option<DeviceState>,
        layout: PixelLayout,
        native_width: u32,
        native_height: u32,
        sequence: u64,
    }

    impl DeviceCamera {
        pub(super) fn new(config: &CameraConfig) -> Self {
            Self {
                native_width: config.width,
                native_height: config.height,
                config: config.clone(),
                state: None,
                layout: PixelLayout::Mjpeg,
                sequence: 0,
            }
        }

        pub(super) fn device(&self) -> &str {
            &self.config.device
        }

        pub(super) fn connect(&mut self) -> Result<()> {
            let unavailable =
                |e: std::io::Error| Error::DeviceUnavailable(format!("{}: {e}", self.config.device));

            let device = v4l::Device::with_path(&self.config.device).map_err(unavailable)?;

            let mut format = device.format().map_err(unavailable)?;
            format.width = self.config.width;
            format.height = self.config.height;
            format.fourcc = v4l::FourCC::new(b"MJPG");

            let format = match device.set_format(&format) {
                Ok(format) => format,
                Err(e) => {
                    tracing::warn!(device = %self.config.device, error = %e, "failed to set MJPG format");
                    device.format().map_err(unavailable)?
                }
            };

            self.layout = if format.fourcc == v4l::FourCC::new(b"RGB3") {
                PixelLayout::Rgb24
            } else if format.fourcc == v4l::FourCC::new(b"MJPG") {
                PixelLayout::Mjpeg
            } else {
                return Err(Error::DeviceUnavailable(format!(
                    "{}: unsupported pixel format {}",
                    self.config.device, format.fourcc
                )));
            };
            self.native_width = format.width;
            self.native_height = format.height;

            let timeout = self.config.capture_timeout;
            let state = DeviceState::try_new(device, |device| {
                let mut stream = MmapStream::with_buffers(device, Type::VideoCapture, 4)?;
                stream.set_timeout(timeout);
                Ok::<_, std::io::Error>(stream)
            })
            .map_err(unavailable)?;
            self.state = Some(state);

            tracing::info!(
                device = %self.config.device,
                width = self.native_width,
                height = self.native_height,
                layout = ?self.layout,
                "camera connected"
            );
            Ok(())
        }

        pub(super) fn next_frame(&mut self) -> Result<Frame> {
            let device = self.config.device.clone();
            let state = self
                .state
                .as_mut()
                .ok_or_else(|| Error::DeviceUnavailable(format!("{device} not connected")))?;

            let bytes = state
                .with_stream_mut(|stream| stream.next().map(|(buf, _meta)| buf.to_vec()))
                .map_err(|e| Error::DeviceUnavailable(format!("{device}: {e}")))?;

            self.sequence += 1;
            let frame = match self.layout {
                PixelLayout::Rgb24 => {
                    Frame::from_rgb(bytes, self.native_width, self.native_height, self.sequence)?
                }
                PixelLayout::Mjpeg => {
                    let image = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg)
                        .map_err(|e| Error::DeviceUnavailable(format!("{device}: {e}")))?
                        .to_rgb8();
                    Frame::from_image(image, self.sequence)
                }
            };

            Ok(frame.resized(self.config.width, self.config.height))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(device: &str) -> CameraConfig {
        CameraConfig {
            device: device.to_string(),
            width: 64,
            height: 48,
            ..CameraConfig::default()
        }
    }

    #[test]
    fn test_synthetic_frames_are_sequenced() {
        let mut camera = CameraSource::open(&stub("stub://desk")).unwrap();
        camera.connect().unwrap();

        let first = camera.next_frame().unwrap();
        let second = camera.next_frame().unwrap();
        assert_eq!(first.width(), 64);
        assert_eq!(first.height(), 48);
        assert!(second.sequence() > first.sequence());
    }

    #[test]
    fn test_read_before_connect_fails() {
        let mut camera = CameraSource::open(&stub("stub://desk")).unwrap();
        assert!(matches!(camera.next_frame(), Err(Error::DeviceUnavailable(_))));
    }

    #[test]
    fn test_failing_stub() {
        let mut camera = CameraSource::open(&stub("stub://fail")).unwrap();
        camera.connect().unwrap();
        assert!(matches!(camera.next_frame(), Err(Error::DeviceUnavailable(_))));
    }

    #[cfg(not(feature = "camera-v4l2"))]
    #[test]
    fn test_device_requires_feature() {
        assert!(matches!(CameraSource::open(&stub("/dev/video0")), Err(Error::Config(_))));
    }
}
