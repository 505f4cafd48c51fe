/// Discretized Hough line fit over recorded trails
use std::sync::OnceLock;

use crate::detector::flags::FlagGrid;
use crate::detector::trail::{Follow, Trail, follow_seek, follow_seek_loc, follow_step, follow_step2};
use crate::models::PixelLoc;

/// Angle buckets (one per degree over a half turn)
pub const HOUGH_RES: usize = 180;

/// Angles within this many buckets of an avoided angle are skipped
const HOUGH_AVOID: usize = HOUGH_RES / 6;

/// Perpendicular distance accepted into the accumulator (fixed point x256)
const OFFSET_LIMIT: i32 = 3 * 256;

/// Smallest peak count accepted as a line
pub const LINE_MIN_MAG: i32 = 5;

struct HoughTables {
    cos: [i32; HOUGH_RES],
    sin: [i32; HOUGH_RES],
}

fn tables() -> &'static HoughTables {
    static TABLES: OnceLock<HoughTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut cos = [0i32; HOUGH_RES];
        let mut sin = [0i32; HOUGH_RES];
        for i in 0..HOUGH_RES {
            let radians = (i as f64).to_radians();
            cos[i] = (radians.cos() * 256.0).round() as i32;
            sin[i] = (radians.sin() * 256.0).round() as i32;
        }
        HoughTables { cos, sin }
    })
}

/// Best-fit line through part of a trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BestLine {
    /// Angle bucket in degrees
    pub angle: usize,
    /// Perpendicular offset band (0, 1 or 2)
    pub h_offset: usize,
    /// Peak accumulator count
    pub mag: i32,
    /// Trail step where the peak vote started
    pub step_beg: i32,
    /// Furthest upstream step still on the line
    pub step_pos: i32,
    /// Furthest downstream step still on the line
    pub step_neg: i32,
    /// Squared distance between the two line ends
    pub dist_sq: i32,
    /// Wander range along the line, in pixels
    pub devn: i32,
    /// Trail pixel at `step_beg`
    pub loc_beg: PixelLoc,
    /// Trail pixel at `step_pos`
    pub loc_pos: PixelLoc,
    /// Trail pixel at `step_neg`
    pub loc_neg: PixelLoc,
}

/// Which angle buckets take part in the vote
fn angle_mask(avoid: Option<usize>) -> [bool; HOUGH_RES] {
    let mut test = [true; HOUGH_RES];
    if let Some(avoid) = avoid {
        let min = (avoid + HOUGH_AVOID) % HOUGH_RES;
        let max = (avoid + HOUGH_RES - HOUGH_AVOID) % HOUGH_RES;
        for (i, t) in test.iter_mut().enumerate() {
            *t = if min > max { i > min || i < max } else { i > min && i < max };
        }
    }
    test
}

/// Accumulator over (offset band, angle bucket)
struct Accumulator {
    hough: [[i32; HOUGH_RES]; 3],
    test: [bool; HOUGH_RES],
    angle_best: usize,
    offset_best: usize,
}

impl Accumulator {
    fn new(avoid: Option<usize>) -> Self {
        Self {
            hough: [[0; HOUGH_RES]; 3],
            test: angle_mask(avoid),
            angle_best: 0,
            offset_best: 0,
        }
    }

    /// Vote for every tested angle whose line through the anchor passes near `(x_diff, y_diff)`
    fn vote(&mut self, x_diff: i32, y_diff: i32) {
        let t = tables();
        for i in 0..HOUGH_RES {
            if !self.test[i] {
                continue;
            }
            let dh = t.cos[i] * y_diff - t.sin[i] * x_diff;
            if !(-OFFSET_LIMIT..=OFFSET_LIMIT).contains(&dh) {
                continue;
            }
            let band = if dh > 128 {
                2
            } else if dh >= -128 {
                1
            } else {
                0
            };
            self.hough[band][i] += 1;
            if self.hough[band][i] > self.hough[self.offset_best][self.angle_best] {
                self.angle_best = i;
                self.offset_best = band;
            }
        }
    }

    fn finish(&self, line: &mut BestLine) {
        line.angle = self.angle_best;
        line.h_offset = self.offset_best;
        line.mag = self.hough[self.offset_best][self.angle_best];
    }
}

/// Walk direction and step count from `step0` to `step1` around a trail of
/// `total` steps
///
/// The count uses truncating remainder: a step pair that lies behind the walk
/// direction yields a non-positive count and nothing is walked.
fn trip_plan(step0: i32, step1: i32, total: i32) -> (i32, i32) {
    if step0 != 0 {
        let (sign, trip) = if step0 > 0 {
            (1, (step1 - step0 + total) % total)
        } else {
            (-1, (step0 - step1 + total) % total)
        };
        (sign, if trip == 0 { total } else { trip })
    } else if step1 != 0 {
        (step1.signum(), step1.abs())
    } else {
        (1, total)
    }
}

/// Fit a line to the trail section starting at `step0`, walking toward `step1`
///
/// The walk direction follows the sign of `step0` (or `step1` when `step0` is
/// the trail start); `avoid` excludes angles near an already-found edge.
pub fn find_best_solid_line(
    flags: &FlagGrid,
    trail: &Trail,
    step0: i32,
    step1: i32,
    avoid: Option<usize>,
) -> BestLine {
    let (sign, trip_steps) = trip_plan(step0, step1, trail.steps_total.max(1));

    let mut follow = follow_seek(flags, trail, step0);
    let anchor = follow.loc;
    let mut line = BestLine {
        step_beg: step0,
        step_pos: step0,
        step_neg: step0,
        loc_beg: anchor,
        loc_pos: anchor,
        loc_neg: anchor,
        ..BestLine::default()
    };

    let mut acc = Accumulator::new(avoid);
    for _ in 0..trip_steps {
        acc.vote(follow.loc.x - anchor.x, follow.loc.y - anchor.y);
        follow = follow_step(flags, trail, &follow, sign);
    }
    acc.finish(&mut line);

    tracing::trace!(angle = line.angle, mag = line.mag, step = step0, "trail line");
    line
}

/// Fit a line to a free path recorded from `loc0`, `trip_steps` long in direction `sign`
pub fn find_best_solid_line_loc(
    flags: &FlagGrid,
    loc0: PixelLoc,
    trip_steps: i32,
    sign: i32,
    avoid: Option<usize>,
) -> BestLine {
    let mut follow: Follow = follow_seek_loc(flags, loc0);
    let anchor = follow.loc;
    let mut line = BestLine {
        loc_beg: anchor,
        loc_pos: anchor,
        loc_neg: anchor,
        ..BestLine::default()
    };

    let mut acc = Accumulator::new(avoid);
    for _ in 0..trip_steps {
        acc.vote(follow.loc.x - anchor.x, follow.loc.y - anchor.y);
        follow = follow_step2(flags, &follow, sign);
    }
    acc.finish(&mut line);

    tracing::trace!(angle = line.angle, mag = line.mag, "edge line");
    line
}

/// Extend `line` along the trail in both directions while points stay on it
///
/// Fills in `loc_pos`/`loc_neg`, the squared span and the wander deviation;
/// returns `false` when the line is too short or too wavy to trust.
pub fn find_travel_limits(flags: &FlagGrid, trail: &Trail, line: &mut BestLine) -> bool {
    let mut follow_pos = follow_seek(flags, trail, line.step_beg);
    let mut follow_neg = follow_pos;
    let loc0 = follow_pos.loc;

    let t = tables();
    let cos = t.cos[line.angle];
    let sin = t.sin[line.angle];

    let mut dist_sq_max = 0;
    let mut pos_max = loc0;
    let mut neg_max = loc0;

    let (mut pos_travel, mut neg_travel) = (0i32, 0i32);
    let (mut pos_wander, mut pos_min, mut pos_max_w, mut pos_min_lock, mut pos_max_lock) = (0i32, 0, 0, 0, 0);
    let (mut neg_wander, mut neg_min, mut neg_max_w, mut neg_min_lock, mut neg_max_lock) = (0i32, 0, 0, 0, 0);

    for i in 0..trail.steps_total / 2 {
        let pos_running = i < 10 || pos_wander.abs() < pos_travel.abs();
        let neg_running = i < 10 || neg_wander.abs() < neg_travel.abs();
        if !pos_running && !neg_running {
            break;
        }

        if pos_running {
            let x_diff = follow_pos.loc.x - loc0.x;
            let y_diff = follow_pos.loc.y - loc0.y;
            pos_travel = cos * x_diff + sin * y_diff;
            pos_wander = cos * y_diff - sin * x_diff;

            if (-OFFSET_LIMIT..=OFFSET_LIMIT).contains(&pos_wander) {
                let dist_sq = follow_pos.loc.distance_squared(&neg_max);
                if dist_sq > dist_sq_max {
                    pos_max = follow_pos.loc;
                    dist_sq_max = dist_sq;
                    line.step_pos = follow_pos.step;
                    line.loc_pos = follow_pos.loc;
                    pos_min_lock = pos_min;
                    pos_max_lock = pos_max_w;
                }
            } else {
                pos_min = pos_min.min(pos_wander);
                pos_max_w = pos_max_w.max(pos_wander);
            }
        }

        if neg_running {
            let x_diff = follow_neg.loc.x - loc0.x;
            let y_diff = follow_neg.loc.y - loc0.y;
            neg_travel = cos * x_diff + sin * y_diff;
            neg_wander = cos * y_diff - sin * x_diff;

            if (-OFFSET_LIMIT..OFFSET_LIMIT).contains(&neg_wander) {
                let dist_sq = follow_neg.loc.distance_squared(&pos_max);
                if dist_sq > dist_sq_max {
                    neg_max = follow_neg.loc;
                    dist_sq_max = dist_sq;
                    line.step_neg = follow_neg.step;
                    line.loc_neg = follow_neg.loc;
                    neg_min_lock = neg_min;
                    neg_max_lock = neg_max_w;
                }
            } else {
                neg_min = neg_min.min(neg_wander);
                neg_max_w = neg_max_w.max(neg_wander);
            }
        }

        follow_pos = follow_step(flags, trail, &follow_pos, 1);
        follow_neg = follow_step(flags, trail, &follow_neg, -1);
    }

    line.devn = (pos_max_lock - pos_min_lock).max(neg_max_lock - neg_min_lock) / 256;
    line.dist_sq = dist_sq_max;

    line_is_straight(line.dist_sq, line.devn)
}

/// Long enough (10 px) and its wander under a tenth of its length
fn line_is_straight(dist_sq: i32, devn: i32) -> bool {
    dist_sq >= 100 && f64::from(devn * 10) < f64::from(dist_sq).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::flags::{ASSIGNED, DOWNSTREAM_MASK, UPSTREAM_MASK};
    use crate::detector::flow::{PATTERN_X, PATTERN_Y, PointFlow};

    /// Record a straight trail of `len` pixels from `start` stepping in `dir`
    fn straight_trail(flags: &mut FlagGrid, start: PixelLoc, dir: usize, len: i32) -> Trail {
        let back = (dir + 4) % 8;
        let mut loc = start;
        for i in 0..len {
            let mut cell = ASSIGNED;
            if i + 1 < len {
                cell |= (dir as u8) << 3;
            }
            if i > 0 {
                cell |= back as u8;
            }
            *flags.get_mut(loc).unwrap() = cell;
            loc = PixelLoc::new(loc.x + PATTERN_X[dir], loc.y + PATTERN_Y[dir]);
        }
        let end = PixelLoc::new(start.x + PATTERN_X[dir] * (len - 1), start.y + PATTERN_Y[dir] * (len - 1));
        Trail {
            flow_begin: PointFlow { plane: 0, arrive: None, depart: 0, mag: 255, loc: start },
            final_pos: end,
            final_neg: start,
            jump_to_pos: 0,
            jump_to_neg: len - 1,
            steps_total: len - 1,
            bound_min: PixelLoc::new(start.x.min(end.x), start.y.min(end.y)),
            bound_max: PixelLoc::new(start.x.max(end.x), start.y.max(end.y)),
        }
    }

    #[test]
    fn test_tables() {
        let t = tables();
        assert_eq!(t.cos[0], 256);
        assert_eq!(t.sin[90], 256);
        assert_eq!(t.cos[90], 0);
        assert_eq!(t.sin[45], 181);
    }

    #[test]
    fn test_angle_mask() {
        let mask = angle_mask(Some(90));
        assert!(mask[0] && mask[59] && mask[121] && mask[179]);
        assert!(!mask[60] && !mask[90] && !mask[120]);

        let mask = angle_mask(Some(0));
        assert!(!mask[0] && !mask[29] && !mask[150] && !mask[179]);
        assert!(mask[31] && mask[149]);
        assert!(angle_mask(None).iter().all(|&t| t));
    }

    #[test]
    fn test_trip_plan() {
        assert_eq!(trip_plan(5, 20, 100), (1, 15));
        assert_eq!(trip_plan(90, 10, 100), (1, 20));
        assert_eq!(trip_plan(-5, -20, 100), (-1, 15));
        assert_eq!(trip_plan(7, 7, 100), (1, 100));
        assert_eq!(trip_plan(0, -30, 100), (-1, 30));
        assert_eq!(trip_plan(0, 0, 100), (1, 100));
        // Pairs behind the walk give a non-positive count instead of wrapping
        assert_eq!(trip_plan(10, -150, 100), (1, -60));
        assert_eq!(trip_plan(-10, 150, 100), (-1, -60));
    }

    #[test]
    fn test_backward_step_pair_walks_nothing() {
        let mut flags = FlagGrid::new(60, 120);
        let trail = straight_trail(&mut flags, PixelLoc::new(30, 5), 5, 100);
        let line = find_best_solid_line(&flags, &trail, 10, -(trail.steps_total + 50), None);
        assert_eq!(line.mag, 0);
    }

    #[test]
    fn test_straightness_uses_exact_length() {
        // sqrt(931) is about 30.5, so a wander of 3 (x10 = 30) still passes
        assert!(line_is_straight(931, 3));
        assert!(!line_is_straight(900, 3));
        assert!(!line_is_straight(99, 0));
        assert!(line_is_straight(100, 0));
    }

    #[test]
    fn test_diagonal_trail_angle() {
        let mut flags = FlagGrid::new(120, 120);
        // Direction 4 is north-east: a 45 degree line
        let trail = straight_trail(&mut flags, PixelLoc::new(5, 5), 4, 100);
        let line = find_best_solid_line(&flags, &trail, 0, 0, None);
        assert!(line.angle.abs_diff(45) <= 1, "angle {}", line.angle);
        assert!(line.mag >= 90);
    }

    #[test]
    fn test_vertical_trail_with_avoidance() {
        let mut flags = FlagGrid::new(60, 120);
        let trail = straight_trail(&mut flags, PixelLoc::new(30, 5), 5, 100);
        let line = find_best_solid_line(&flags, &trail, 0, 0, None);
        assert_eq!(line.angle, 90);

        // Excluding the true angle leaves only weak fits
        let avoided = find_best_solid_line(&flags, &trail, 0, 0, Some(90));
        assert!(avoided.mag < line.mag);
        assert!(avoided.angle.abs_diff(90) >= HOUGH_AVOID);
    }

    #[test]
    fn test_travel_limits_on_straight_trail() {
        let mut flags = FlagGrid::new(60, 120);
        let trail = straight_trail(&mut flags, PixelLoc::new(30, 5), 5, 100);
        let mut line = find_best_solid_line(&flags, &trail, 0, 0, None);
        assert!(find_travel_limits(&flags, &trail, &mut line));
        assert_eq!(line.devn, 0);
        assert!(line.dist_sq >= 49 * 49);
        assert!(line.step_pos > 0);
    }

    #[test]
    fn test_free_path_fit() {
        let mut flags = FlagGrid::new(60, 60);
        straight_trail(&mut flags, PixelLoc::new(5, 30), 3, 40);
        let line = find_best_solid_line_loc(&flags, PixelLoc::new(5, 30), 39, 1, None);
        assert_eq!(line.angle, 0);
        assert_eq!(line.mag, 39);

        // Sanity: direction bits were laid as expected
        let cell = flags.get(PixelLoc::new(6, 30)).unwrap();
        assert_eq!((cell & UPSTREAM_MASK) >> 3, 3);
        assert_eq!(cell & DOWNSTREAM_MASK, 7);
    }
}
