/// Scan grid: probe locations from coarse to fine
///
/// Each level lays a lattice of plus-shaped probe patterns over the image;
/// the next level halves the pattern extent and fills in between the
/// previous crosses, until the extent falls below the smallest feature size.
use crate::models::PixelLoc;

/// Lazy, finite sequence of probe locations inside a `width x height` image
#[derive(Debug, Clone)]
pub struct ScanGrid {
    min_extent: i32,
    max_extent: i32,
    x_offset: i32,
    y_offset: i32,
    x_max: i32,
    y_max: i32,

    // Per-level state
    extent: i32,
    jump_size: i32,
    pixel_total: i32,
    start_pos: i32,
    pixel_count: i32,
    x_center: i32,
    y_center: i32,
}

enum GridStatus {
    Good(PixelLoc),
    Bad,
    End,
}

impl ScanGrid {
    /// Grid over the whole image; `scan_gap` is the smallest feature to resolve
    pub fn new(width: usize, height: usize, scan_gap: usize) -> Self {
        let x_max = width as i32 - 1;
        let y_max = height as i32 - 1;
        let max_span = x_max.max(y_max);
        let smallest_feature = scan_gap as i32;

        let mut min_extent = 0;
        let mut extent = 1;
        while extent < max_span {
            if extent <= smallest_feature {
                min_extent = extent;
            }
            extent = (extent + 1) * 2 - 1;
        }

        let mut grid = Self {
            min_extent,
            max_extent: extent,
            x_offset: (x_max - extent) / 2,
            y_offset: (y_max - extent) / 2,
            x_max,
            y_max,
            extent,
            jump_size: 0,
            pixel_total: 0,
            start_pos: 0,
            pixel_count: 0,
            x_center: 0,
            y_center: 0,
        };
        grid.set_derived_fields();
        grid
    }

    fn set_derived_fields(&mut self) {
        self.jump_size = self.extent + 1;
        self.pixel_total = 2 * self.extent - 1;
        self.start_pos = self.extent / 2;
        self.pixel_count = 0;
        self.x_center = self.start_pos;
        self.y_center = self.start_pos;
    }

    fn coordinates(&mut self) -> GridStatus {
        if self.pixel_count >= self.pixel_total {
            self.pixel_count = 0;
            self.x_center += self.jump_size;
        }
        if self.x_center > self.max_extent {
            self.x_center = self.start_pos;
            self.y_center += self.jump_size;
        }
        if self.y_center > self.max_extent {
            self.extent /= 2;
            self.set_derived_fields();
        }
        if self.extent == 0 || self.extent < self.min_extent {
            return GridStatus::End;
        }

        let count = self.pixel_count;
        let (x, y) = if count == self.pixel_total - 1 {
            // Centre pixel comes last
            (self.x_center, self.y_center)
        } else {
            let half = self.pixel_total / 2;
            let quarter = half / 2;
            let arm = |c: i32| if c < quarter { c - quarter } else { half - c };
            if count < half {
                (self.x_center + arm(count), self.y_center)
            } else {
                (self.x_center, self.y_center + arm(count - half))
            }
        };

        let (x, y) = (x + self.x_offset, y + self.y_offset);
        if x < 0 || x > self.x_max || y < 0 || y > self.y_max {
            return GridStatus::Bad;
        }
        GridStatus::Good(PixelLoc::new(x, y))
    }
}

impl Iterator for ScanGrid {
    type Item = PixelLoc;

    fn next(&mut self) -> Option<PixelLoc> {
        loop {
            let status = self.coordinates();
            self.pixel_count += 1;
            match status {
                GridStatus::Good(loc) => return Some(loc),
                GridStatus::Bad => continue,
                GridStatus::End => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_full_coverage_without_repeats() {
        let points: Vec<PixelLoc> = ScanGrid::new(100, 60, 1).collect();
        let unique: HashSet<PixelLoc> = points.iter().copied().collect();
        assert_eq!(points.len(), 100 * 60);
        assert_eq!(unique.len(), points.len());
        assert!(points.iter().all(|p| p.x >= 0 && p.x < 100 && p.y >= 0 && p.y < 60));
    }

    #[test]
    fn test_first_cross_is_central() {
        let points: Vec<PixelLoc> = ScanGrid::new(16, 16, 1).collect();
        assert_eq!(points[0], PixelLoc::new(0, 7));
        // The first cross ends on its centre
        assert_eq!(points[28], PixelLoc::new(7, 7));
    }

    #[test]
    fn test_gap_limits_density() {
        let fine = ScanGrid::new(100, 60, 1).count();
        let coarse = ScanGrid::new(100, 60, 8).count();
        assert!(coarse < fine);
        assert!(coarse > 0);
    }

    #[test]
    fn test_tiny_image() {
        let points: Vec<PixelLoc> = ScanGrid::new(2, 2, 1).collect();
        assert_eq!(points, vec![PixelLoc::new(0, 0)]);
    }
}
