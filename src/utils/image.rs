use crate::error::DecodeError;
use crate::utils::grayscale::split_planes;

/// Read-only pixel accessor over one or more 8-bit channel planes
///
/// Coordinates are y-up: `(0, 0)` is the bottom-left pixel of the source
/// image, which is stored top row first. All detector and sampling code works
/// in this frame; only reported corners are flipped back.
#[derive(Debug, Clone)]
pub struct LumaImage {
    width: usize,
    height: usize,
    planes: Vec<Vec<u8>>,
}

impl LumaImage {
    /// Wrap a single luminance plane
    pub fn from_luma(data: Vec<u8>, width: usize, height: usize) -> Result<Self, DecodeError> {
        Self::check_dims(data.len(), width, height, 1)?;
        Ok(Self {
            width,
            height,
            planes: vec![data],
        })
    }

    /// Split a packed image (`channels` bytes per pixel) into planes
    pub fn from_packed(
        pixels: &[u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Self, DecodeError> {
        Self::check_dims(pixels.len(), width, height, channels)?;
        Ok(Self {
            width,
            height,
            planes: split_planes(pixels, width, height, channels),
        })
    }

    fn check_dims(len: usize, width: usize, height: usize, channels: usize) -> Result<(), DecodeError> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(DecodeError::EmptyImage);
        }
        let expected = width * height * channels;
        if len < expected {
            return Err(DecodeError::BufferSize {
                expected,
                actual: len,
            });
        }
        Ok(())
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of planes
    pub fn channel_count(&self) -> usize {
        self.planes.len()
    }

    /// True when `(x, y)` lies inside the image
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Channel value at a y-up location, `None` outside the image
    #[inline]
    pub fn value(&self, channel: usize, x: i32, y: i32) -> Option<u8> {
        if !self.contains(x, y) {
            return None;
        }
        let row = self.height - 1 - y as usize;
        self.planes
            .get(channel)
            .map(|plane| plane[row * self.width + x as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_y_up_addressing() {
        // Top row 1 2, bottom row 3 4
        let img = LumaImage::from_luma(vec![1, 2, 3, 4], 2, 2).unwrap();
        assert_eq!(img.value(0, 0, 0), Some(3));
        assert_eq!(img.value(0, 1, 1), Some(2));
        assert_eq!(img.value(0, 2, 0), None);
        assert_eq!(img.value(1, 0, 0), None);
    }

    #[test]
    fn test_packed_planes() {
        let img = LumaImage::from_packed(&[10, 20, 30, 40, 50, 60], 2, 1, 3).unwrap();
        assert_eq!(img.channel_count(), 3);
        assert_eq!(img.value(2, 1, 0), Some(60));
    }

    #[test]
    fn test_bad_dimensions() {
        assert!(matches!(
            LumaImage::from_luma(vec![0; 3], 2, 2),
            Err(DecodeError::BufferSize { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            LumaImage::from_luma(vec![], 0, 2),
            Err(DecodeError::EmptyImage)
        ));
    }
}
