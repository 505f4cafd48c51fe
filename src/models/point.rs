/// 2D point with floating point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Calculate squared distance (faster, no sqrt)
    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Round to the nearest pixel location
    pub fn to_pixel(&self) -> PixelLoc {
        PixelLoc::new((self.x + 0.5) as i32, (self.y + 0.5) as i32)
    }
}

/// Integer pixel location in image space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelLoc {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl PixelLoc {
    /// Create a new pixel location
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another location
    pub fn distance_squared(&self, other: &PixelLoc) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl From<PixelLoc> for Point {
    fn from(loc: PixelLoc) -> Self {
        Point::new(loc.x as f64, loc.y as f64)
    }
}
