//! rust_dmtx - Data Matrix (ECC200) barcode decoding
//!
//! Locates Data Matrix symbols in raw pixel buffers by tracing the finder
//! edges, fits a perspective transform, samples the modules and decodes the
//! Reed-Solomon protected codewords into bytes.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Decode options and environment overrides
pub mod config;
/// Per-image decode context
pub mod decode;
/// Data Matrix decoding modules (sampling, placement, error correction, encodation)
pub mod decoder;
/// Data Matrix detection modules (scan grid, trails, line fit, region fit)
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (DataMatrix, SymbolSize, Point, etc.)
pub mod models;
/// Helpers for the command-line tool (image loading, datasets)
pub mod tools;
/// Utility functions (grayscale, geometry, pixel access)
pub mod utils;

pub use config::DecodeOptions;
pub use decode::Decode;
pub use error::DecodeError;
pub use models::{DataMatrix, Point, SizeRequest, SymbolShape, SymbolSize};

use utils::grayscale::to_luma_parallel;
use utils::image::LumaImage;

/// Decode the first Data Matrix symbol in an RGB image
///
/// # Arguments
/// * `image` - Raw RGB bytes (3 bytes per pixel), top row first
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Returns
/// The first symbol found, `None` if the image holds no readable symbol
pub fn decode(image: &[u8], width: usize, height: usize) -> Result<Option<DataMatrix>, DecodeError> {
    let luma = luma_from_packed(image, width, height, 3)?;
    Ok(Decode::new(luma, DecodeOptions::default()).next_symbol())
}

/// Decode the first Data Matrix symbol in a grayscale image (1 byte per pixel)
pub fn decode_luma(
    image: &[u8],
    width: usize,
    height: usize,
) -> Result<Option<DataMatrix>, DecodeError> {
    let luma = LumaImage::from_luma(image.to_vec(), width, height)?;
    Ok(Decode::new(luma, DecodeOptions::default()).next_symbol())
}

/// Decode up to `options.max_symbols` symbols from a packed image
///
/// Every channel is searched as its own plane, so symbols printed in a
/// single colour channel are found too.
pub fn decode_all(
    pixels: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    options: &DecodeOptions,
) -> Result<Vec<DataMatrix>, DecodeError> {
    let image = LumaImage::from_packed(pixels, width, height, channels)?;
    let max = options.max_symbols;
    Ok(Decode::new(image, options.clone()).take(max).collect())
}

fn luma_from_packed(
    pixels: &[u8],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<LumaImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage);
    }
    let expected = width * height * channels;
    if pixels.len() < expected {
        return Err(DecodeError::BufferSize {
            expected,
            actual: pixels.len(),
        });
    }
    LumaImage::from_luma(to_luma_parallel(pixels, width, height, channels), width, height)
}

/// Decoder with configuration options
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    /// Create a new decoder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with specific options
    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Options used for every decode
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode the first symbol in a packed image, converted to luminance first
    pub fn decode(
        &self,
        pixels: &[u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Option<DataMatrix>, DecodeError> {
        let luma = luma_from_packed(pixels, width, height, channels)?;
        Ok(Decode::new(luma, self.options.clone()).next_symbol())
    }

    /// Decode every symbol in a packed image, one plane per channel
    pub fn decode_all(
        &self,
        pixels: &[u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Vec<DataMatrix>, DecodeError> {
        decode_all(pixels, width, height, channels, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty() {
        // Uniform image holds no symbol
        let image = vec![0u8; 300]; // 10x10 RGB
        assert_eq!(decode(&image, 10, 10).unwrap(), None);
    }

    #[test]
    fn test_buffer_checks() {
        assert_eq!(decode(&[], 0, 10), Err(DecodeError::EmptyImage));
        assert_eq!(
            decode(&[0u8; 10], 4, 4),
            Err(DecodeError::BufferSize {
                expected: 48,
                actual: 10
            })
        );
        assert_eq!(
            decode_luma(&[0u8; 10], 4, 4),
            Err(DecodeError::BufferSize {
                expected: 16,
                actual: 10
            })
        );
    }

    #[test]
    fn test_decoder_zero_channels() {
        let decoder = Decoder::new();
        assert!(decoder.decode_all(&[0u8; 16], 4, 4, 0).is_err());
    }
}
