//! Captured camera frames

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};

use crate::{Error, Result};

/// One captured RGB8 image
///
/// Frames are deliberately not `Clone`: a frame moves from the camera through
/// the channel to exactly one consumer.
pub struct Frame {
    image: RgbImage,
    sequence: u64,
}

impl Frame {
    /// Wrap raw RGB8 pixels
    ///
    /// # Errors
    ///
    /// Returns error if the buffer length does not match `width * height * 3`
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = u64::from(width) * u64::from(height) * 3;
        let actual = pixels.len() as u64;
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            Error::DeviceUnavailable(format!(
                "frame length mismatch: expected {expected}, got {actual}"
            ))
        })?;

        Ok(Self::from_image(image, sequence))
    }

    /// Wrap a decoded image
    #[must_use]
    pub fn from_image(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    /// Solid grey frame, used by synthetic sources and tests
    #[must_use]
    pub fn blank(width: u32, height: u32, sequence: u64) -> Self {
        Self::from_image(RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128])), sequence)
    }

    /// Resize to the given dimensions, keeping the sequence number
    #[must_use]
    pub fn resized(self, width: u32, height: u32) -> Self {
        if self.image.width() == width && self.image.height() == height {
            return self;
        }

        let image = image::imageops::resize(&self.image, width, height, FilterType::Triangle);
        Self { image, ..self }
    }

    /// Encode as JPEG for upload to an inference server
    ///
    /// # Errors
    ///
    /// Returns error if encoding fails
    pub fn to_jpeg(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.image.write_to(&mut cursor, ImageFormat::Jpeg)?;
        Ok(cursor.into_inner())
    }

    /// Monotonic capture sequence number
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish_non_exhaustive()
    }
}
