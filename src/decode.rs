//! Decode context: one image, one flag arena, one scan grid
//!
//! Regions are searched one probe at a time. A sized region that reaches
//! message decoding has its quadrilateral marked visited, so repeated calls
//! to [`Decode::next_symbol`] walk through every symbol in the image.

use std::time::Instant;

use crate::config::DecodeOptions;
use crate::decoder::message::decode_region;
use crate::detector::flags::FlagGrid;
use crate::detector::region::{Region, scan_pixel};
use crate::detector::scan::ScanGrid;
use crate::models::{DataMatrix, Point};
use crate::utils::image::LumaImage;

/// Normalized corners just outside the unit square, counter-clockwise from
/// the finder corner
const QUAD_CORNERS: [(f64, f64); 4] = [(-0.1, -0.1), (1.1, -0.1), (1.1, 1.1), (-0.1, 1.1)];

/// Search state for one image
pub struct Decode {
    image: LumaImage,
    flags: FlagGrid,
    grid: ScanGrid,
    options: DecodeOptions,
    deadline: Option<Instant>,
}

impl Decode {
    /// Start a search over `image`; the timeout clock starts now
    pub fn new(image: LumaImage, options: DecodeOptions) -> Self {
        let (width, height) = (image.width(), image.height());
        Self {
            flags: FlagGrid::new(width, height),
            grid: ScanGrid::new(width, height, options.scan_gap),
            deadline: options.timeout.map(|t| Instant::now() + t),
            image,
            options,
        }
    }

    /// Image being searched
    pub fn image(&self) -> &LumaImage {
        &self.image
    }

    /// Options this search was started with
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    fn timed_out(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Next fitted and sized region, or `None` once the grid is exhausted or
    /// time has run out
    pub fn next_region(&mut self) -> Option<Region> {
        loop {
            if self.timed_out() {
                tracing::debug!("decode timed out");
                return None;
            }
            let loc = self.grid.next()?;
            tracing::trace!(x = loc.x, y = loc.y, "scan probe");
            if let Some(region) = scan_pixel(&self.image, &mut self.flags, loc, &self.options) {
                return Some(region);
            }
        }
    }

    /// Next decoded symbol
    ///
    /// Regions whose message fails Reed-Solomon or encodation decoding are
    /// logged and skipped.
    pub fn next_symbol(&mut self) -> Option<DataMatrix> {
        loop {
            let region = self.next_region()?;
            let quad = region_quad(&region);
            if let Some(quad) = quad {
                self.flags.fill_quad(quad);
            }

            let text = match decode_region(&self.image, &region, self.options.fnc1) {
                Ok(text) => text,
                Err(err) => {
                    tracing::debug!(
                        rows = region.size.rows,
                        cols = region.size.cols,
                        %err,
                        "message decode failed"
                    );
                    continue;
                }
            };
            let Some(quad) = quad else {
                continue;
            };

            let mut symbol = DataMatrix::new(text.data, *region.size);
            symbol.pad_count = text.pad_count;
            symbol.angle = region_angle(&region).unwrap_or(0.0);
            // y-up fit space back to top-down image rows
            let top = self.image.height() as f64 - 1.0;
            symbol.corners = quad.map(|p| Point::new(p.x, top - p.y));

            tracing::debug!(
                rows = region.size.rows,
                cols = region.size.cols,
                bytes = symbol.data.len(),
                "symbol decoded"
            );
            return Some(symbol);
        }
    }
}

impl Iterator for Decode {
    type Item = DataMatrix;

    fn next(&mut self) -> Option<DataMatrix> {
        self.next_symbol()
    }
}

/// Symbol outline in y-up pixel space, including a little of the quiet zone
fn region_quad(region: &Region) -> Option<[Point; 4]> {
    let mut quad = [Point::default(); 4];
    for (corner, (x, y)) in quad.iter_mut().zip(QUAD_CORNERS) {
        *corner = region.to_raw(Point::new(x, y))?;
    }
    Some(quad)
}

/// Direction of the solid bottom edge, counter-clockwise from the x axis
fn region_angle(region: &Region) -> Option<f64> {
    let p00 = region.to_raw(Point::new(0.0, 0.0))?;
    let p10 = region.to_raw(Point::new(1.0, 0.0))?;
    Some((p10.y - p00.y).atan2(p10.x - p00.x))
}
