use super::{Point, SymbolSize};

/// A decoded Data Matrix symbol
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    /// Raw decoded bytes
    pub data: Vec<u8>,
    /// Decoded content as (lossy) UTF-8 string
    pub content: String,
    /// Symbol size the region was read as
    pub size: SymbolSize,
    /// Corner points in image coordinates, counter-clockwise from the
    /// finder corner: bottom-left, bottom-right, top-right, top-left
    pub corners: [Point; 4],
    /// Rotation of the bottom (solid) finder edge in radians
    pub angle: f64,
    /// Number of pad codewords that followed the message
    pub pad_count: usize,
}

impl DataMatrix {
    /// Create a new result from decoded bytes
    pub fn new(data: Vec<u8>, size: SymbolSize) -> Self {
        let content = String::from_utf8_lossy(&data).into_owned();
        Self {
            data,
            content,
            size,
            corners: [Point::default(); 4],
            angle: 0.0,
            pad_count: 0,
        }
    }

    /// Axis-aligned bounding box of the corners as (min, max)
    pub fn bounding_box(&self) -> (Point, Point) {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for c in &self.corners[1..] {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let size = *SymbolSize::from_dimensions(10, 10).unwrap();
        let mut dm = DataMatrix::new(b"hi".to_vec(), size);
        dm.corners = [
            Point::new(10.0, 50.0),
            Point::new(50.0, 52.0),
            Point::new(48.0, 12.0),
            Point::new(8.0, 10.0),
        ];
        let (min, max) = dm.bounding_box();
        assert_eq!(min, Point::new(8.0, 10.0));
        assert_eq!(max, Point::new(50.0, 52.0));
        assert_eq!(dm.content, "hi");
    }
}
