//! Source image access under the cross-origin taint model.
//!
//! A product photo served from another origin without permissive access
//! headers still renders and reports its intrinsic size, but its pixels may
//! not be read back. [`SourceImage`] carries that policy with the image so
//! the capture pipeline cannot forget to honor it.

use std::path::Path;

use image::RgbaImage;

use crate::error::{CaptureError, UnreadablePixels};
use crate::geometry::NaturalSize;

/// Pixel read-back policy for a loaded image.
#[derive(Debug, Clone)]
pub enum PixelAccess {
    Readable(RgbaImage),
    Tainted,
}

#[derive(Debug, Clone)]
pub struct SourceImage {
    natural: NaturalSize,
    pixels: PixelAccess,
}

impl SourceImage {
    pub fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let img = image::open(path).map_err(CaptureError::ImageLoad)?;
        Ok(Self::from_pixels(img.to_rgba8()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CaptureError> {
        let img = image::load_from_memory(bytes).map_err(CaptureError::ImageLoad)?;
        Ok(Self::from_pixels(img.to_rgba8()))
    }

    pub fn from_pixels(pixels: RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            natural: NaturalSize::new(width, height),
            pixels: PixelAccess::Readable(pixels),
        }
    }

    /// A cross-origin image: dimensions are known, pixels are not.
    pub fn tainted(natural: NaturalSize) -> Self {
        Self {
            natural,
            pixels: PixelAccess::Tainted,
        }
    }

    /// Drop pixel access but keep the size, turning this source into the
    /// cross-origin case. Coordinate mapping keeps working.
    pub fn with_taint(self) -> Self {
        Self::tainted(self.natural)
    }

    pub fn natural_size(&self) -> NaturalSize {
        self.natural
    }

    pub fn is_tainted(&self) -> bool {
        matches!(self.pixels, PixelAccess::Tainted)
    }

    /// Guarded read-back. Tainted sources fail here instead of yielding
    /// blank or garbage pixels further down the pipeline.
    pub fn read_pixels(&self) -> Result<&RgbaImage, UnreadablePixels> {
        match &self.pixels {
            PixelAccess::Readable(pixels) => Ok(pixels),
            PixelAccess::Tainted => Err(UnreadablePixels),
        }
    }
}
