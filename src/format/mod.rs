pub mod fourcc;
pub use fourcc::FourCC;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fraction::Fraction;

/// Pixel layouts the simulated hardware can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Rgb24,
    Yuy2,
}

impl PixelFormat {
    /// Maps a four character code to a supported layout
    pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match fourcc {
            FourCC::RGB3 => Some(PixelFormat::Rgb24),
            FourCC::YUYV => Some(PixelFormat::Yuy2),
            _ => None,
        }
    }

    pub fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Rgb24 => FourCC::RGB3,
            PixelFormat::Yuy2 => FourCC::YUYV,
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Yuy2 => 2,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fourcc().fmt(f)
    }
}

/// Stream description handed to the device when hardware resources are acquired
///
/// A negative `height` describes a top-down surface, a positive one a bottom-up surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub fourcc: FourCC,
    pub width: u32,
    pub height: i32,
    pub interval: Fraction,
    pub image_size: u32,
}

impl VideoInfo {
    /// Returns a description of a tightly packed stream
    ///
    /// # Example
    ///
    /// ```
    /// use capsim::{format::FourCC, Fraction, VideoInfo};
    ///
    /// let info = VideoInfo::packed(FourCC::RGB3, 640, 480, Fraction::per_second(30));
    /// assert_eq!(info.image_size, 640 * 480 * 3);
    /// ```
    pub fn packed(fourcc: FourCC, width: u32, height: i32, interval: Fraction) -> Self {
        let bpp = PixelFormat::from_fourcc(fourcc)
            .map(PixelFormat::bytes_per_pixel)
            .unwrap_or(0);

        // saturated sizes are refused by start
        let image_size = width
            .saturating_mul(height.unsigned_abs())
            .saturating_mul(bpp);

        VideoInfo {
            fourcc,
            width,
            height,
            interval,
            image_size,
        }
    }
}

impl fmt::Display for VideoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width          : {}", self.width)?;
        writeln!(f, "height         : {}", self.height)?;
        writeln!(f, "fourcc         : {}", self.fourcc)?;
        writeln!(f, "interval       : {}", self.interval)?;
        writeln!(f, "image size     : {}", self.image_size)?;
        Ok(())
    }
}

/// Frame geometry fixed for the lifetime of one hardware run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub image_size: usize,
}

impl Geometry {
    /// Validates and returns a frame geometry
    ///
    /// The image size must be able to hold `height` rows of `width * bytes_per_pixel` bytes.
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32, image_size: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "empty frame ({}x{})",
                width, height
            )));
        }
        if bytes_per_pixel == 0 {
            return Err(Error::invalid("zero bytes per pixel"));
        }

        let geometry = Geometry {
            width,
            height,
            bytes_per_pixel,
            image_size,
        };
        let frame_bytes = geometry.frame_bytes();
        if image_size < frame_bytes {
            return Err(Error::invalid(format!(
                "image size {} cannot hold a {}x{} frame of {} bytes",
                image_size, width, height, frame_bytes
            )));
        }

        Ok(geometry)
    }

    /// Bytes in one tightly packed row
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel as usize
    }

    /// Bytes the hardware places per frame
    pub fn frame_bytes(&self) -> usize {
        self.row_bytes() * self.height as usize
    }
}
