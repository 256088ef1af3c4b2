//! Fingerprint image raster

use as608_core::constants::image::{HEIGHT, PACKED_SIZE, WIDTH};

use crate::error::{Error, Result};

/// 8-bit grayscale image, row-major
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    samples: Vec<u8>,
}

impl Raster {
    /// Unpack an uploaded image
    ///
    /// The module sends two 4-bit samples per byte, high nibble first. Each
    /// sample is widened to 8 bits by shifting it into the high nibble.
    pub fn from_packed(packed: &[u8]) -> Result<Self> {
        if packed.len() != PACKED_SIZE {
            return Err(Error::Validation(format!(
                "image carries {} samples, expected {}x{}",
                packed.len() * 2,
                WIDTH,
                HEIGHT
            )));
        }

        let samples = packed
            .iter()
            .flat_map(|b| [b & 0xF0, (b & 0x0F) << 4])
            .collect();

        Ok(Self { samples })
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        WIDTH
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        HEIGHT
    }

    /// All samples, row-major
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// One row of samples
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        (y < HEIGHT).then(|| &self.samples[y * WIDTH..(y + 1) * WIDTH])
    }

    /// Sample at `(x, y)`
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= WIDTH {
            return None;
        }
        self.row(y).map(|row| row[x])
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Raster({}x{})", WIDTH, HEIGHT)
    }
}
