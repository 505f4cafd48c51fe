/// Per-pixel flag arena shared by every region attempt on one image
use crate::models::{PixelLoc, Point};

/// Pixel belongs to a trail currently being walked
pub const VISITED: u8 = 0x80;
/// Pixel has been assigned trail direction bits
pub const ASSIGNED: u8 = 0x40;
/// Step direction toward the positive end of the trail (bits 5-3)
pub const UPSTREAM_MASK: u8 = 0x38;
/// Step direction toward the negative end of the trail (bits 2-0)
pub const DOWNSTREAM_MASK: u8 = 0x07;

/// One byte per pixel, indexed `y * width + x` in the y-up frame
#[derive(Debug, Clone)]
pub struct FlagGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl FlagGrid {
    /// All-clear grid covering a `width x height` image
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    #[inline]
    fn index(&self, loc: PixelLoc) -> Option<usize> {
        if loc.x < 0 || loc.y < 0 || loc.x as usize >= self.width || loc.y as usize >= self.height {
            return None;
        }
        Some(loc.y as usize * self.width + loc.x as usize)
    }

    /// Flag byte at `loc`, `None` outside the image
    #[inline]
    pub fn get(&self, loc: PixelLoc) -> Option<u8> {
        self.index(loc).map(|i| self.cells[i])
    }

    /// Mutable flag byte at `loc`, `None` outside the image
    #[inline]
    pub fn get_mut(&mut self, loc: PixelLoc) -> Option<&mut u8> {
        self.index(loc).map(move |i| &mut self.cells[i])
    }

    /// True when `loc` is inside the image and marked visited
    #[inline]
    pub fn is_visited(&self, loc: PixelLoc) -> bool {
        self.get(loc).is_some_and(|f| f & VISITED != 0)
    }

    /// Mark every pixel inside the convex quad `p0 p1 p2 p3` as visited
    ///
    /// Used after a successful decode so later probes skip the symbol.
    pub fn fill_quad(&mut self, quad: [Point; 4]) {
        let min_x = quad.iter().map(|p| p.x).fold(f64::INFINITY, f64::min).floor().max(0.0) as usize;
        let max_x = quad.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max).ceil();
        let min_y = quad.iter().map(|p| p.y).fold(f64::INFINITY, f64::min).floor().max(0.0) as usize;
        let max_y = quad.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max).ceil();
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }
        let max_x = (max_x as usize).min(self.width.saturating_sub(1));
        let max_y = (max_y as usize).min(self.height.saturating_sub(1));

        // Winding of the quad decides which side of each edge is inside
        let area: f64 = (0..4)
            .map(|i| {
                let (a, b) = (quad[i], quad[(i + 1) % 4]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        let sign = if area >= 0.0 { 1.0 } else { -1.0 };

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Point::new(x as f64, y as f64);
                let inside = (0..4).all(|i| {
                    let (a, b) = (quad[i], quad[(i + 1) % 4]);
                    sign * ((b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)) >= 0.0
                });
                if inside {
                    self.cells[y * self.width + x] |= VISITED;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let mut grid = FlagGrid::new(4, 3);
        assert_eq!(grid.get(PixelLoc::new(3, 2)), Some(0));
        assert_eq!(grid.get(PixelLoc::new(4, 0)), None);
        assert!(grid.get_mut(PixelLoc::new(-1, 0)).is_none());
        *grid.get_mut(PixelLoc::new(1, 1)).unwrap() |= VISITED;
        assert!(grid.is_visited(PixelLoc::new(1, 1)));
    }

    #[test]
    fn test_fill_quad() {
        let mut grid = FlagGrid::new(20, 20);
        // Clockwise and counter-clockwise winding both fill
        grid.fill_quad([
            Point::new(2.0, 2.0),
            Point::new(10.0, 2.0),
            Point::new(10.0, 10.0),
            Point::new(2.0, 10.0),
        ]);
        assert!(grid.is_visited(PixelLoc::new(5, 5)));
        assert!(grid.is_visited(PixelLoc::new(2, 10)));
        assert!(!grid.is_visited(PixelLoc::new(11, 5)));

        let mut grid = FlagGrid::new(20, 20);
        grid.fill_quad([
            Point::new(2.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 2.0),
            Point::new(2.0, 2.0),
        ]);
        assert!(grid.is_visited(PixelLoc::new(5, 5)));
    }
}
