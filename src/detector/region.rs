//! Region discovery and geometric fit
//!
//! A region grows from one edge seed: the finder "L" is traced as a trail,
//! two best-fit lines give its left and bottom edges, the opposite
//! calibration edges are traced next, and the four intersections define the
//! transform between image pixels and normalized symbol space. A symbol size
//! is accepted only when the calibration bars sampled through that transform
//! alternate as expected.

use std::f64::consts::FRAC_PI_2;

use crate::config::DecodeOptions;
use crate::detector::flags::FlagGrid;
use crate::detector::flow::{PointFlow, seek_edge};
use crate::detector::hough::{
    BestLine, LINE_MIN_MAG, find_best_solid_line, find_best_solid_line_loc, find_travel_limits,
};
use crate::detector::trail::{BresLine, blaze_continuous, blaze_gapped, follow_seek};
use crate::models::{PixelLoc, Point, SizeRequest, SymbolShape, SymbolSize};
use crate::utils::geometry::{ALMOST_ZERO, Matrix3, Ray2, right_angle_trueness};
use crate::utils::image::LumaImage;

/// Shortest trail worth fitting lines to
const MIN_TRAIL_STEPS: i32 = 40;

/// Weakest calibration contrast accepted during size determination
const MIN_CONTRAST: i32 = 20;

/// Tolerated transition miscount on any verification bar
const MAX_JUMP_ERRORS: i32 = 2;

/// Shortest side, in pixels, of a fitted quadrilateral
const MIN_SIDE: f64 = 8.0;

/// Sub-module sample offsets averaged when reading a module's colour
const SAMPLE_X: [f64; 5] = [0.5, 0.4, 0.5, 0.6, 0.5];
const SAMPLE_Y: [f64; 5] = [0.5, 0.5, 0.4, 0.5, 0.6];

/// One fitted edge: angle bucket in degrees and a pixel on the edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeFit {
    /// Line angle in degrees (0-179)
    pub angle: usize,
    /// A pixel on the line
    pub loc: PixelLoc,
}

impl EdgeFit {
    fn ray(&self) -> Ray2 {
        Ray2::from_angle(self.loc.into(), self.angle as f64)
    }
}

/// Calibration edge refined after the finder edges are known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibEdge {
    /// Alternating edge opposite the bottom finder bar
    Top,
    /// Alternating edge opposite the left finder bar
    Right,
}

/// Direction of a module transition count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpDirection {
    /// Along the top calibration row
    Right,
    /// Along the right calibration column
    Up,
}

/// Geometry of a region before its size is known
#[derive(Debug, Clone, Copy)]
pub struct RegionFit {
    /// Channel plane the seed edge was found on
    pub plane: usize,
    /// Walking direction (+1/-1) of the finder trail relative to the symbol
    pub polarity: i32,
    /// Trail point anchoring the not-yet-fitted right edge
    pub loc_r: PixelLoc,
    /// Trail point anchoring the not-yet-fitted top edge
    pub loc_t: PixelLoc,
    /// Solid left finder edge
    pub left: EdgeFit,
    /// Solid bottom finder edge
    pub bottom: EdgeFit,
    /// Top calibration edge once aligned
    pub top: Option<EdgeFit>,
    /// Right calibration edge once aligned
    pub right: Option<EdgeFit>,
    /// Image pixels to normalized symbol space
    pub raw2fit: Matrix3,
    /// Normalized symbol space to image pixels
    pub fit2raw: Matrix3,
}

/// A fitted, sized region ready for module sampling
#[derive(Debug, Clone, Copy)]
pub struct Region {
    /// Channel plane the symbol was found on
    pub plane: usize,
    /// Finder trail direction, as in [`RegionFit::polarity`]
    pub polarity: i32,
    /// Image pixels to normalized symbol space
    pub raw2fit: Matrix3,
    /// Normalized symbol space to image pixels
    pub fit2raw: Matrix3,
    /// Symbol size chosen by size determination
    pub size: &'static SymbolSize,
    /// Average colour of dark ("on") calibration modules
    pub on_color: i32,
    /// Average colour of light ("off") calibration modules
    pub off_color: i32,
}

impl Region {
    /// Averaged colour of the module at (`row`, `col`), row 0 at the finder bar
    pub fn module_color(&self, image: &LumaImage, row: i32, col: i32) -> i32 {
        read_module_color(image, self.plane, &self.fit2raw, self.size, row, col)
    }

    /// Colour mapped so larger values mean "more on"
    pub fn on_strength(&self, color: i32) -> i32 {
        if self.off_color > self.on_color {
            self.off_color - color
        } else {
            color - self.off_color
        }
    }

    /// Hysteresis threshold between on and off modules
    pub fn jump_threshold(&self) -> i32 {
        ((0.4 * (self.on_color - self.off_color) as f64 + 0.5) as i32).abs()
    }

    /// Point in normalized symbol space mapped into image pixels (y-up)
    pub fn to_raw(&self, p: Point) -> Option<Point> {
        p.transform(&self.fit2raw)
    }
}

/// Sample the module at (`row`, `col`) of a `size` symbol through `fit2raw`
///
/// Five samples around the module centre are averaged; samples that fall
/// outside the image count as black.
pub fn read_module_color(
    image: &LumaImage,
    plane: usize,
    fit2raw: &Matrix3,
    size: &SymbolSize,
    row: i32,
    col: i32,
) -> i32 {
    let (rows, cols) = (size.rows as f64, size.cols as f64);
    let mut color = 0i32;
    for (sx, sy) in SAMPLE_X.iter().zip(SAMPLE_Y.iter()) {
        let p = Point::new((col as f64 + sx) / cols, (row as f64 + sy) / rows);
        if let Some(raw) = p.transform(fit2raw) {
            let (x, y) = ((raw.x + 0.5) as i32, (raw.y + 0.5) as i32);
            color += image.value(plane, x, y).map_or(0, i32::from);
        }
    }
    color / 5
}

/// Try to grow a complete region from the pixel at `loc`
pub fn scan_pixel(
    image: &LumaImage,
    flags: &mut FlagGrid,
    loc: PixelLoc,
    opts: &DecodeOptions,
) -> Option<Region> {
    if flags.get(loc).is_none() || flags.is_visited(loc) {
        return None;
    }

    let flow = seek_edge(image, flags, loc)?;
    if flow.mag < opts.edge_gate() {
        return None;
    }

    let mut fit = orientation(image, flags, flow, opts)?;
    let reject = |stage: &str| {
        tracing::debug!(x = loc.x, y = loc.y, stage, "region rejected");
    };

    let (width, height) = (image.width(), image.height());
    let devn = opts.square_deviation_cos();
    let shape = opts.size_request.shape();

    if update_xfrms(&mut fit, width, height, devn).is_none() {
        reject("initial fit");
        return None;
    }
    for edge in [CalibEdge::Top, CalibEdge::Right] {
        if align_calib_edge(image, flags, &mut fit, edge, shape).is_none() {
            reject("calibration edge");
            return None;
        }
        if update_xfrms(&mut fit, width, height, devn).is_none() {
            reject("refit");
            return None;
        }
    }

    let region = find_size(image, &fit, opts.size_request);
    if region.is_none() {
        reject("size");
    }
    region
}

/// Trace the finder trail from `flow` and classify its two edges
pub fn orientation(
    image: &LumaImage,
    flags: &mut FlagGrid,
    flow: PointFlow,
    opts: &DecodeOptions,
) -> Option<RegionFit> {
    let shape = opts.size_request.shape();
    let max_diagonal = opts.edge_max.map(|edge| {
        let factor = if shape == SymbolShape::Rectangle { 1.23 } else { 1.56 };
        (factor * edge as f64 + 0.5) as i32
    });

    let trail = blaze_continuous(image, flags, flow, max_diagonal)?;
    if trail.steps_total < MIN_TRAIL_STEPS {
        return None;
    }

    if let Some(edge_min) = opts.edge_min {
        let edge_min = edge_min as i32;
        let min_area = if shape == SymbolShape::Square {
            edge_min * edge_min
        } else {
            2 * edge_min * edge_min
        };
        if trail.bound_area() < min_area {
            return None;
        }
    }

    let mut line1 = find_best_solid_line(flags, &trail, 0, 0, None);
    if line1.mag < LINE_MIN_MAG || !find_travel_limits(flags, &trail, &mut line1) {
        return None;
    }

    let seek_pos = follow_seek(flags, &trail, line1.step_pos + 5);
    let line2p = find_best_solid_line(flags, &trail, seek_pos.step, line1.step_neg, Some(line1.angle));
    let seek_neg = follow_seek(flags, &trail, line1.step_neg - 5);
    let line2n = find_best_solid_line(flags, &trail, seek_neg.step, line1.step_pos, Some(line1.angle));
    if line2p.mag.max(line2n.mag) < LINE_MIN_MAG {
        return None;
    }

    let edge = |line: &BestLine| EdgeFit {
        angle: line.angle,
        loc: line.loc_beg,
    };
    let cross = |a: (PixelLoc, PixelLoc), b: (PixelLoc, PixelLoc)| {
        (a.0.x - a.1.x) * (b.0.y - b.1.y) - (a.0.y - a.1.y) * (b.0.x - b.1.x)
    };

    let (polarity, loc_r, loc_t, left, bottom) = if line2p.mag > line2n.mag {
        let mut line2 = line2p;
        if !find_travel_limits(flags, &trail, &mut line2) {
            return None;
        }
        if cross((line1.loc_pos, line1.loc_neg), (line2.loc_pos, line2.loc_neg)) > 0 {
            (1, line2.loc_pos, line1.loc_neg, edge(&line1), edge(&line2))
        } else {
            (-1, line1.loc_neg, line2.loc_pos, edge(&line2), edge(&line1))
        }
    } else {
        let mut line2 = line2n;
        if !find_travel_limits(flags, &trail, &mut line2) {
            return None;
        }
        if cross((line1.loc_neg, line1.loc_pos), (line2.loc_neg, line2.loc_pos)) > 0 {
            (-1, line2.loc_neg, line1.loc_pos, edge(&line1), edge(&line2))
        } else {
            (1, line1.loc_pos, line2.loc_neg, edge(&line2), edge(&line1))
        }
    };

    tracing::trace!(
        polarity,
        left = left.angle,
        bottom = bottom.angle,
        "finder edges"
    );

    Some(RegionFit {
        plane: flow.plane,
        polarity,
        loc_r,
        loc_t,
        left,
        bottom,
        top: None,
        right: None,
        raw2fit: Matrix3::identity(),
        fit2raw: Matrix3::identity(),
    })
}

/// Intersect the four edge rays and rebuild both fit transforms
///
/// Edges not yet refined borrow the angle of the opposite edge.
pub fn update_xfrms(fit: &mut RegionFit, width: usize, height: usize, square_devn: f64) -> Option<()> {
    let left = fit.left.ray();
    let bottom = fit.bottom.ray();
    let top = fit.top.map_or_else(
        || Ray2::from_angle(fit.loc_t.into(), fit.bottom.angle as f64),
        |e| e.ray(),
    );
    let right = fit.right.map_or_else(
        || Ray2::from_angle(fit.loc_r.into(), fit.left.angle as f64),
        |e| e.ray(),
    );

    let p00 = left.intersect(&bottom)?;
    let p10 = bottom.intersect(&right)?;
    let p11 = right.intersect(&top)?;
    let p01 = top.intersect(&left)?;

    let (raw2fit, fit2raw) = fit_corners(p00, p10, p11, p01, width, height, square_devn)?;
    fit.raw2fit = raw2fit;
    fit.fit2raw = fit2raw;
    Some(())
}

/// Validate a corner quadrilateral and derive `(raw2fit, fit2raw)`
///
/// `p00` is the finder corner, `p10` the end of the bottom edge, `p11` the
/// far corner and `p01` the end of the left edge.
pub fn fit_corners(
    p00: Point,
    p10: Point,
    p11: Point,
    p01: Point,
    width: usize,
    height: usize,
    square_devn: f64,
) -> Option<(Matrix3, Matrix3)> {
    let x_max = width as f64 - 1.0;
    let y_max = height as f64 - 1.0;
    let inside = |p: &Point| p.x >= 0.0 && p.y >= 0.0 && p.x <= x_max && p.y <= y_max;
    if !inside(&p00) || !inside(&p01) || !inside(&p10) {
        return None;
    }

    let v_ot = p01.sub(&p00);
    let v_or = p10.sub(&p00);
    let v_tx = p11.sub(&p01);
    let v_rx = p11.sub(&p10);
    let (dim_ot, dim_or, dim_tx, dim_rx) = (v_ot.mag(), v_or.mag(), v_tx.mag(), v_rx.mag());

    if dim_ot <= MIN_SIDE || dim_or <= MIN_SIDE || dim_tx <= MIN_SIDE || dim_rx <= MIN_SIDE {
        return None;
    }

    // Opposite sides must be of comparable length
    let ratio = dim_ot / dim_rx;
    if ratio <= 0.5 || ratio >= 2.0 {
        return None;
    }
    let ratio = dim_or / dim_tx;
    if ratio <= 0.5 || ratio >= 2.0 {
        return None;
    }

    // Bowtie
    if v_or.cross(&v_rx) <= 0.0 || v_ot.cross(&v_tx) >= 0.0 {
        return None;
    }

    if right_angle_trueness(&p00, &p10, &p11, FRAC_PI_2)? <= square_devn
        || right_angle_trueness(&p10, &p11, &p01, FRAC_PI_2)? <= square_devn
    {
        return None;
    }

    let phi = v_ot.x.atan2(v_ot.y);
    let m = Matrix3::translate(-p00.x, -p00.y).multiply(&Matrix3::rotate(phi));

    let v = p10.transform(&m)?;
    if v.x.abs() <= ALMOST_ZERO {
        return None;
    }
    let shx = -v.y / v.x;
    let scx = 1.0 / v.x;
    let m = m
        .multiply(&Matrix3::shear(0.0, shx))
        .multiply(&Matrix3::scale(scx, 1.0));

    let v = p11.transform(&m)?;
    if v.y.abs() <= ALMOST_ZERO {
        return None;
    }
    let scy = 1.0 / v.y;
    let m = m.multiply(&Matrix3::scale(1.0, scy));

    let skx = p11.transform(&m)?.x;
    let m = m.multiply(&Matrix3::line_skew_side(1.0, skx, 1.0)?);

    let sky = p01.transform(&m)?.y;
    let raw2fit = m.multiply(&Matrix3::line_skew_top(sky, 1.0, 1.0)?);

    let fit2raw = Matrix3::line_skew_top_inv(sky, 1.0, 1.0)?
        .multiply(&Matrix3::line_skew_side_inv(1.0, skx, 1.0)?)
        .multiply(&Matrix3::scale(1.0 / scx, 1.0 / scy))
        .multiply(&Matrix3::shear(0.0, -shx))
        .multiply(&Matrix3::rotate(-phi))
        .multiply(&Matrix3::translate(p00.x, p00.y));

    Some((raw2fit, fit2raw))
}

/// Trace the top or right calibration edge and record its fitted line
pub fn align_calib_edge(
    image: &LumaImage,
    flags: &mut FlagGrid,
    fit: &mut RegionFit,
    edge: CalibEdge,
    shape: SymbolShape,
) -> Option<()> {
    let loc_origin = Point::new(0.0, 0.0).transform(&fit.fit2raw)?.to_pixel();

    let (stream_dir, avoid, loc0, target) = match edge {
        CalibEdge::Top => {
            let y = if shape == SymbolShape::Rectangle { 0.2 } else { 0.6 };
            (-fit.polarity, fit.left.angle, fit.loc_t, Point::new(0.8, y))
        }
        CalibEdge::Right => {
            let x = if shape == SymbolShape::Square { 0.7 } else { 0.9 };
            (fit.polarity, fit.bottom.angle, fit.loc_r, Point::new(x, 0.8))
        }
    };
    let loc1 = target.transform(&fit.fit2raw)?.to_pixel();

    let line = BresLine::new(loc0, loc1, loc_origin);
    let steps = blaze_gapped(image, flags, fit.plane, line, stream_dir)?;
    let best = find_best_solid_line_loc(flags, loc0, steps, stream_dir, Some(avoid));
    if steps == 0 || best.mag < LINE_MIN_MAG {
        return None;
    }

    let fitted = Some(EdgeFit {
        angle: best.angle,
        loc: best.loc_beg,
    });
    tracing::trace!(?edge, angle = best.angle, steps, "calibration edge");
    match edge {
        CalibEdge::Top => fit.top = fitted,
        CalibEdge::Right => fit.right = fitted,
    }
    Some(())
}

/// Pick the symbol size whose calibration bars show the strongest contrast
///
/// The winning size must then pass transition counts along both calibration
/// bars, both finder bars, and the quiet zone on all four sides.
pub fn find_size(image: &LumaImage, fit: &RegionFit, request: SizeRequest) -> Option<Region> {
    let mut best: Option<(&'static SymbolSize, i32, i32, i32)> = None;

    for size in request.candidates() {
        let (rows, cols) = (size.rows as i32, size.cols as i32);
        let (mut on, mut off) = (0i32, 0i32);

        let row = rows - 1;
        for col in 0..cols {
            let color = read_module_color(image, fit.plane, &fit.fit2raw, size, row, col);
            if col & 1 != 0 {
                off += color;
            } else {
                on += color;
            }
        }
        let col = cols - 1;
        for row in 0..rows {
            let color = read_module_color(image, fit.plane, &fit.fit2raw, size, row, col);
            if row & 1 != 0 {
                off += color;
            } else {
                on += color;
            }
        }

        on = on * 2 / (rows + cols);
        off = off * 2 / (rows + cols);
        let contrast = (on - off).abs();
        if contrast < MIN_CONTRAST {
            continue;
        }
        if best.is_none_or(|(_, c, _, _)| contrast > c) {
            best = Some((size, contrast, on, off));
        }
    }

    let (size, _, on_color, off_color) = best?;
    let region = Region {
        plane: fit.plane,
        polarity: fit.polarity,
        raw2fit: fit.raw2fit,
        fit2raw: fit.fit2raw,
        size,
        on_color,
        off_color,
    };
    let (rows, cols) = (size.rows as i32, size.cols as i32);

    let calib_h = count_jump_tally(image, &region, 0, rows - 1, JumpDirection::Right);
    if (1 + calib_h - cols).abs() > MAX_JUMP_ERRORS {
        return None;
    }
    let calib_v = count_jump_tally(image, &region, cols - 1, 0, JumpDirection::Up);
    if (1 + calib_v - rows).abs() > MAX_JUMP_ERRORS {
        return None;
    }

    let quiet_bars = [
        (0, 0, JumpDirection::Right),
        (0, 0, JumpDirection::Up),
        (0, -1, JumpDirection::Right),
        (-1, 0, JumpDirection::Up),
        (0, rows, JumpDirection::Right),
        (cols, 0, JumpDirection::Up),
    ];
    for (x, y, dir) in quiet_bars {
        if count_jump_tally(image, &region, x, y, dir) > MAX_JUMP_ERRORS {
            return None;
        }
    }

    tracing::trace!(rows, cols, on_color, off_color, "symbol size");
    Some(region)
}

/// Count on/off transitions walking a row or column of modules
///
/// Bars outside the symbol start in the "off" state, bars on it start "on".
pub fn count_jump_tally(image: &LumaImage, region: &Region, x_start: i32, y_start: i32, dir: JumpDirection) -> i32 {
    let (rows, cols) = (region.size.rows as i32, region.size.cols as i32);
    let (x_inc, y_inc) = match dir {
        JumpDirection::Right => (1, 0),
        JumpDirection::Up => (0, 1),
    };

    let mut state_on = !(x_start == -1 || x_start == cols || y_start == -1 || y_start == rows);
    let threshold = region.jump_threshold();
    let mut t_module = region.on_strength(region.module_color(image, y_start, x_start));
    let mut jumps = 0;

    let (mut x, mut y) = (x_start + x_inc, y_start + y_inc);
    while (dir == JumpDirection::Right && x < cols) || (dir == JumpDirection::Up && y < rows) {
        let t_prev = t_module;
        t_module = region.on_strength(region.module_color(image, y, x));

        if state_on {
            if t_module < t_prev - threshold {
                jumps += 1;
                state_on = false;
            }
        } else if t_module > t_prev + threshold {
            jumps += 1;
            state_on = true;
        }
        x += x_inc;
        y += y_inc;
    }

    jumps
}
