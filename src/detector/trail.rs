/// Trail blazing along finder edges and navigation over the recorded trail
///
/// A trail is stored entirely in the [`FlagGrid`]: every pixel carries the
/// compass direction toward its upstream and downstream neighbour, so the
/// trail can be walked in either direction from any step offset.
use crate::detector::flags::{ASSIGNED, DOWNSTREAM_MASK, FlagGrid, UPSTREAM_MASK, VISITED};
use crate::detector::flow::{PATTERN_X, PATTERN_Y, PointFlow, point_flow, strongest_neighbor};
use crate::models::PixelLoc;
use crate::utils::image::LumaImage;

/// Edge strength below which a trail stops
pub const TRAIL_MIN_MAG: i32 = 50;

/// Step direction for a unit move, indexed by `3 * dy + dx + 4` (8 = no move)
const DIR_MAP: [usize; 9] = [0, 1, 2, 7, 8, 3, 6, 5, 4];

/// A continuous edge trail recorded in the flag grid
#[derive(Debug, Clone, Copy)]
pub struct Trail {
    /// Seed flow the trail grew from (step 0)
    pub flow_begin: PointFlow,
    /// Last pixel reached walking upstream
    pub final_pos: PixelLoc,
    /// Last pixel reached walking downstream
    pub final_neg: PixelLoc,
    /// Downstream step count (where a negative walk wraps to `final_pos`)
    pub jump_to_pos: i32,
    /// Upstream step count (where a positive walk wraps to `final_neg`)
    pub jump_to_neg: i32,
    /// Pixels on the trail, both directions together
    pub steps_total: i32,
    /// Lower corner of the trail's bounding box
    pub bound_min: PixelLoc,
    /// Upper corner of the trail's bounding box
    pub bound_max: PixelLoc,
}

impl Trail {
    fn exceeds(&self, max_diagonal: Option<i32>) -> bool {
        max_diagonal.is_some_and(|d| {
            self.bound_max.x - self.bound_min.x > d || self.bound_max.y - self.bound_min.y > d
        })
    }

    fn extend_bounds(&mut self, loc: PixelLoc) {
        self.bound_min.x = self.bound_min.x.min(loc.x);
        self.bound_min.y = self.bound_min.y.min(loc.y);
        self.bound_max.x = self.bound_max.x.max(loc.x);
        self.bound_max.y = self.bound_max.y.max(loc.y);
    }

    /// Area of the trail's bounding box
    pub fn bound_area(&self) -> i32 {
        (self.bound_max.x - self.bound_min.x) * (self.bound_max.y - self.bound_min.y)
    }
}

/// Cursor on a trail: location, signed step offset and the flag byte there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Follow {
    /// Current pixel
    pub loc: PixelLoc,
    /// Signed offset from the trail seed
    pub step: i32,
    /// Flag byte at `loc`
    pub neighbor: u8,
}

impl Follow {
    fn at(flags: &FlagGrid, loc: PixelLoc, step: i32) -> Self {
        Self {
            loc,
            step,
            neighbor: flags.get(loc).unwrap_or(0),
        }
    }

    /// Location one step along the recorded direction bits
    fn advance(&self, sign: i32) -> PixelLoc {
        let pattern_idx = if sign < 0 {
            (self.neighbor & DOWNSTREAM_MASK) as usize
        } else {
            ((self.neighbor & UPSTREAM_MASK) >> 3) as usize
        };
        PixelLoc::new(self.loc.x + PATTERN_X[pattern_idx], self.loc.y + PATTERN_Y[pattern_idx])
    }
}

/// Walk the edge from `flow_begin` in both directions, recording the trail
///
/// Returns `None` when the seed lies outside the grid or the trail's bounding
/// box outgrows `max_diagonal`. The visited bit is cleared from the whole
/// trail before returning; direction and assigned bits stay.
pub fn blaze_continuous(
    image: &LumaImage,
    flags: &mut FlagGrid,
    flow_begin: PointFlow,
    max_diagonal: Option<i32>,
) -> Option<Trail> {
    *flags.get_mut(flow_begin.loc)? = VISITED | ASSIGNED;

    let mut trail = Trail {
        flow_begin,
        final_pos: flow_begin.loc,
        final_neg: flow_begin.loc,
        jump_to_pos: 0,
        jump_to_neg: 0,
        steps_total: 0,
        bound_min: flow_begin.loc,
        bound_max: flow_begin.loc,
    };

    for sign in [1i32, -1] {
        let mut flow = flow_begin;
        let mut steps = 0;

        loop {
            if trail.exceeds(max_diagonal) {
                break;
            }
            let Some(next) = strongest_neighbor(image, flags, &flow, sign) else {
                break;
            };
            if next.mag < TRAIL_MIN_MAG {
                break;
            }
            let (Some(arrive), Some(_)) = (next.arrive, flags.get(next.loc)) else {
                break;
            };
            let arrive = arrive as u8;
            let back = (arrive + 4) % 8;

            if let Some(cell) = flags.get_mut(flow.loc) {
                *cell |= if sign < 0 { arrive } else { arrive << 3 };
            }
            if let Some(cell) = flags.get_mut(next.loc) {
                *cell = (if sign < 0 { back << 3 } else { back }) | VISITED | ASSIGNED;
            }

            flow = next;
            trail.extend_bounds(flow.loc);
            steps += 1;
        }

        if sign > 0 {
            trail.final_pos = flow.loc;
            trail.jump_to_neg = steps;
        } else {
            trail.final_neg = flow.loc;
            trail.jump_to_pos = steps;
        }
    }
    trail.steps_total = trail.jump_to_pos + trail.jump_to_neg;

    trail_clear(flags, &trail, VISITED);

    tracing::trace!(
        begin_x = flow_begin.loc.x,
        begin_y = flow_begin.loc.y,
        pos_x = trail.final_pos.x,
        pos_y = trail.final_pos.y,
        neg_x = trail.final_neg.x,
        neg_y = trail.final_neg.y,
        steps = trail.steps_total,
        "trail"
    );

    if trail.exceeds(max_diagonal) {
        return None;
    }
    Some(trail)
}

/// Clear `mask` bits from every pixel of the trail
pub fn trail_clear(flags: &mut FlagGrid, trail: &Trail, mask: u8) -> usize {
    let mut clears = 0;
    let mut follow = follow_seek(flags, trail, 0);
    while follow.step.abs() <= trail.steps_total {
        if let Some(cell) = flags.get_mut(follow.loc) {
            *cell &= !mask;
        }
        follow = follow_step(flags, trail, &follow, 1);
        clears += 1;
    }
    clears
}

/// Cursor `seek` steps away from the trail start
pub fn follow_seek(flags: &FlagGrid, trail: &Trail, seek: i32) -> Follow {
    let mut follow = Follow::at(flags, trail.flow_begin.loc, 0);
    let sign = if seek > 0 { 1 } else { -1 };
    let mut i = 0;
    while i != seek {
        follow = follow_step(flags, trail, &follow, sign);
        if follow.step.abs() > trail.steps_total {
            break;
        }
        i += sign;
    }
    follow
}

/// One step along the trail, wrapping from one end to the other
pub fn follow_step(flags: &FlagGrid, trail: &Trail, begin: &Follow, sign: i32) -> Follow {
    let factor = trail.steps_total + 1;
    let step_mod = if sign > 0 {
        (factor + begin.step % factor) % factor
    } else {
        (factor - begin.step % factor) % factor
    };

    let loc = if sign > 0 && step_mod == trail.jump_to_neg {
        trail.final_neg
    } else if sign < 0 && step_mod == trail.jump_to_pos {
        trail.final_pos
    } else {
        begin.advance(sign)
    };

    Follow::at(flags, loc, begin.step + sign)
}

/// Cursor at an arbitrary location, used for trails not anchored to a [`Trail`]
pub fn follow_seek_loc(flags: &FlagGrid, loc: PixelLoc) -> Follow {
    Follow::at(flags, loc, 0)
}

/// One step along the direction bits with no wraparound
pub fn follow_step2(flags: &FlagGrid, begin: &Follow, sign: i32) -> Follow {
    Follow::at(flags, begin.advance(sign), begin.step + sign)
}

/// Bresenham walker between two pixels that also knows its outward side
#[derive(Debug, Clone, Copy)]
pub struct BresLine {
    x_step: i32,
    y_step: i32,
    x_delta: i32,
    y_delta: i32,
    steep: bool,
    x_out: i32,
    y_out: i32,
    travel: i32,
    outward: i32,
    error: i32,
    /// Current pixel
    pub loc: PixelLoc,
}

impl BresLine {
    /// Line from `loc0` toward `loc1`; "outward" points away from `loc_inside`
    pub fn new(loc0: PixelLoc, loc1: PixelLoc, loc_inside: PixelLoc) -> Self {
        let x_delta = (loc1.x - loc0.x).abs();
        let y_delta = (loc1.y - loc0.y).abs();
        let steep = y_delta > x_delta;

        // Order the endpoints so the cross product sign is meaningful
        let (beg, end) = if steep {
            if loc0.y < loc1.y { (loc0, loc1) } else { (loc1, loc0) }
        } else if loc0.x > loc1.x {
            (loc0, loc1)
        } else {
            (loc1, loc0)
        };
        let cp = (end.x - beg.x) * (loc_inside.y - end.y) - (end.y - beg.y) * (loc_inside.x - end.x);
        let out = if cp > 0 { 1 } else { -1 };

        Self {
            x_step: if loc0.x < loc1.x { 1 } else { -1 },
            y_step: if loc0.y < loc1.y { 1 } else { -1 },
            x_delta,
            y_delta,
            steep,
            x_out: if steep { out } else { 0 },
            y_out: if steep { 0 } else { out },
            travel: 0,
            outward: 0,
            error: if steep { y_delta / 2 } else { x_delta / 2 },
            loc: loc0,
        }
    }

    /// Move one pixel along the line (by the sign of `travel`) then `outward` pixels out
    pub fn step(&mut self, travel: i32, outward: i32) {
        if travel > 0 {
            self.travel += 1;
            if self.steep {
                self.loc.y += self.y_step;
                self.error -= self.x_delta;
                if self.error < 0 {
                    self.loc.x += self.x_step;
                    self.error += self.y_delta;
                }
            } else {
                self.loc.x += self.x_step;
                self.error -= self.y_delta;
                if self.error < 0 {
                    self.loc.y += self.y_step;
                    self.error += self.x_delta;
                }
            }
        } else if travel < 0 {
            self.travel -= 1;
            if self.steep {
                self.loc.y -= self.y_step;
                self.error += self.x_delta;
                if self.error >= self.y_delta {
                    self.loc.x -= self.x_step;
                    self.error -= self.y_delta;
                }
            } else {
                self.loc.x -= self.x_step;
                self.error += self.y_delta;
                if self.error >= self.x_delta {
                    self.loc.y -= self.y_step;
                    self.error -= self.x_delta;
                }
            }
        }

        for _ in 0..outward.max(0) {
            self.outward += 1;
            self.loc.x += self.x_out;
            self.loc.y += self.y_out;
        }
    }

    /// Travel and outward steps needed to reach `target`
    ///
    /// `None` when the target is more than one pixel away along the line.
    pub fn get_step(&self, target: PixelLoc) -> Option<(i32, i32)> {
        let travel = if self.steep {
            if self.y_step > 0 { target.y - self.loc.y } else { self.loc.y - target.y }
        } else if self.x_step > 0 {
            target.x - self.loc.x
        } else {
            self.loc.x - target.x
        };
        if travel.abs() > 1 {
            return None;
        }

        let mut ahead = *self;
        ahead.step(travel, 0);
        let outward = if self.steep {
            if self.x_out > 0 { target.x - ahead.loc.x } else { ahead.loc.x - target.x }
        } else if self.y_out > 0 {
            target.y - ahead.loc.y
        } else {
            ahead.loc.y - target.y
        };
        Some((travel, outward))
    }
}

/// Trace an edge along `line`, stepping straight through gaps
///
/// Direction bits are written so the path can be replayed with
/// [`follow_step2`] in `stream_dir`. Returns the number of steps recorded, or
/// `None` when the start pixel is outside the image.
pub fn blaze_gapped(
    image: &LumaImage,
    flags: &mut FlagGrid,
    plane: usize,
    mut line: BresLine,
    stream_dir: i32,
) -> Option<i32> {
    let loc0 = line.loc;
    let mut flow = point_flow(image, plane, loc0, None);
    let dist_sq_max = line.x_delta * line.x_delta + line.y_delta * line.y_delta;
    let mut steps = 0;
    let mut on_edge = true;

    let mut before = loc0;
    *flags.get_mut(before)? = 0;

    loop {
        if on_edge {
            let Some(current) = flow else {
                break;
            };
            let Some(next) = strongest_neighbor(image, flags, &current, stream_dir) else {
                break;
            };
            let Some((travel, outward)) = line.get_step(next.loc) else {
                break;
            };
            if next.mag < TRAIL_MIN_MAG || outward < 0 || (outward == 0 && travel < 0) {
                on_edge = false;
            } else {
                line.step(travel, outward);
                flow = Some(next);
            }
        }

        if !on_edge {
            line.step(1, 0);
            flow = point_flow(image, plane, line.loc, None);
            if flow.is_some_and(|f| f.mag > TRAIL_MIN_MAG) {
                on_edge = true;
            }
        }

        let after = line.loc;
        if flags.get(after).is_none() {
            break;
        }

        let (dx, dy) = (after.x - before.x, after.y - before.y);
        if dx.abs() > 1 || dy.abs() > 1 {
            break;
        }
        let dir = DIR_MAP[(3 * dy + dx + 4) as usize];
        if dir == 8 {
            break;
        }
        let dir = dir as u8;
        let back = (dir + 4) % 8;

        if let Some(cell) = flags.get_mut(before) {
            *cell |= ASSIGNED | if stream_dir < 0 { dir } else { dir << 3 };
        }
        if let Some(cell) = flags.get_mut(after) {
            *cell = if stream_dir < 0 { back << 3 } else { back };
        }

        let (x_diff, y_diff) = (line.loc.x - loc0.x, line.loc.y - loc0.y);
        before = after;
        steps += 1;

        if x_diff * x_diff + y_diff * y_diff >= dist_sq_max {
            break;
        }
    }

    Some(steps)
}
