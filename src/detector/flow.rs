/// Edge flow: compass-direction edge response at a pixel
use crate::detector::flags::{FlagGrid, VISITED};
use crate::models::PixelLoc;
use crate::utils::image::LumaImage;

/// Neighbour x offsets, indexed by compass direction (SW, S, SE, E, NE, N, NW, W)
pub const PATTERN_X: [i32; 8] = [-1, 0, 1, 1, 1, 0, -1, -1];
/// Neighbour y offsets (y-up), same indexing as [`PATTERN_X`]
pub const PATTERN_Y: [i32; 8] = [-1, -1, -1, 0, 1, 1, 1, 0];

/// Sobel-like weights laid around the ring of neighbours
const COEFFICIENT: [i32; 8] = [0, 1, 2, 1, 0, -1, -2, -1];

/// Smallest flow magnitude accepted as an edge when seeding
const SEED_MIN_MAG: i32 = 10;

/// Strongest edge response found at a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointFlow {
    /// Channel plane the response was measured on
    pub plane: usize,
    /// Direction this pixel was reached from, `None` for a seed
    pub arrive: Option<usize>,
    /// Compass direction of the gradient
    pub depart: usize,
    /// Gradient magnitude, 0 when the pixel was rejected
    pub mag: i32,
    /// Pixel location
    pub loc: PixelLoc,
}

/// Neighbour location in compass direction `dir`
#[inline]
pub fn neighbor(loc: PixelLoc, dir: usize) -> PixelLoc {
    PixelLoc::new(loc.x + PATTERN_X[dir], loc.y + PATTERN_Y[dir])
}

/// Circular distance between two compass directions
#[inline]
pub fn compass_distance(a: usize, b: usize) -> usize {
    let diff = a.abs_diff(b);
    if diff > 4 { 8 - diff } else { diff }
}

/// Convolve the 8-neighbourhood of `loc` and keep the strongest axis
///
/// Returns `None` when any neighbour lies outside the image.
pub fn point_flow(image: &LumaImage, plane: usize, loc: PixelLoc, arrive: Option<usize>) -> Option<PointFlow> {
    let mut ring = [0i32; 8];
    for (dir, value) in ring.iter_mut().enumerate() {
        let n = neighbor(loc, dir);
        *value = image.value(plane, n.x, n.y)? as i32;
    }

    let mut mag = [0i32; 4];
    let mut compass_max = 0usize;
    for compass in 0..4 {
        for (pattern_idx, &color) in ring.iter().enumerate() {
            mag[compass] += COEFFICIENT[(pattern_idx + 8 - compass) % 8] * color;
        }
        if compass != 0 && mag[compass].abs() > mag[compass_max].abs() {
            compass_max = compass;
        }
    }

    Some(PointFlow {
        plane,
        arrive,
        depart: if mag[compass_max] > 0 { compass_max + 4 } else { compass_max },
        mag: mag[compass_max].abs(),
        loc,
    })
}

/// Strongest unvisited neighbour continuing the edge through `center`
///
/// `sign` selects the walking direction along the edge. More than two
/// visited neighbours means the walk ran into an existing trail.
pub fn strongest_neighbor(
    image: &LumaImage,
    flags: &FlagGrid,
    center: &PointFlow,
    sign: i32,
) -> Option<PointFlow> {
    let attempt = if sign < 0 { center.depart } else { (center.depart + 4) % 8 };
    let mut occupied = 0;
    let mut strongest: Option<PointFlow> = None;

    for i in 0..8 {
        let loc = neighbor(center.loc, i);
        let Some(flag) = flags.get(loc) else {
            continue;
        };
        if flag & VISITED != 0 {
            occupied += 1;
            if occupied > 2 {
                return None;
            }
            continue;
        }
        if compass_distance(attempt, i) > 1 {
            continue;
        }

        let Some(flow) = point_flow(image, center.plane, loc, Some(i)) else {
            continue;
        };
        // Ties go to axis-aligned (odd) directions
        let better = match &strongest {
            None => true,
            Some(best) => flow.mag > best.mag || (flow.mag == best.mag && i & 1 != 0),
        };
        if better {
            strongest = Some(flow);
        }
    }

    strongest
}

/// Seed flow at `loc`: strongest plane, with a round-trip symmetry check
pub fn seek_edge(image: &LumaImage, flags: &FlagGrid, loc: PixelLoc) -> Option<PointFlow> {
    let mut best: Option<PointFlow> = None;
    for plane in 0..image.channel_count() {
        if let Some(flow) = point_flow(image, plane, loc, None) {
            if best.is_none_or(|b| flow.mag > b.mag) {
                best = Some(flow);
            }
        }
    }
    let flow = best?;
    if flow.mag < SEED_MIN_MAG {
        return None;
    }

    let pos = strongest_neighbor(image, flags, &flow, 1)?;
    let neg = strongest_neighbor(image, flags, &flow, -1)?;
    let pos_back = strongest_neighbor(image, flags, &pos, -1)?;
    let neg_back = strongest_neighbor(image, flags, &neg, 1)?;

    let opposite = |a: Option<usize>, b: Option<usize>| match (a, b) {
        (Some(a), Some(b)) => a == (b + 4) % 8,
        _ => false,
    };
    if opposite(pos.arrive, pos_back.arrive) && opposite(neg.arrive, neg_back.arrive) {
        tracing::trace!(x = loc.x, y = loc.y, mag = flow.mag, "edge seed");
        return Some(PointFlow { arrive: None, ..flow });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dark left half, light right half, 9x9
    fn vertical_edge() -> LumaImage {
        let data = (0..81).map(|i| if i % 9 < 4 { 0 } else { 255 }).collect();
        LumaImage::from_luma(data, 9, 9).unwrap()
    }

    #[test]
    fn test_compass_distance() {
        assert_eq!(compass_distance(0, 7), 1);
        assert_eq!(compass_distance(1, 5), 4);
        assert_eq!(compass_distance(6, 2), 4);
        assert_eq!(compass_distance(3, 3), 0);
    }

    #[test]
    fn test_point_flow_on_vertical_edge() {
        let img = vertical_edge();
        let flow = point_flow(&img, 0, PixelLoc::new(4, 4), None).unwrap();
        // Brightness rises toward +x, so the edge runs north/south
        assert_eq!(flow.mag, 4 * 255);
        assert_eq!(flow.depart, 5);

        let flat = point_flow(&img, 0, PixelLoc::new(7, 4), None).unwrap();
        assert_eq!(flat.mag, 0);
        assert!(point_flow(&img, 0, PixelLoc::new(0, 4), None).is_none());
    }

    #[test]
    fn test_neighbor_follows_edge() {
        let img = vertical_edge();
        let flags = FlagGrid::new(9, 9);
        let center = point_flow(&img, 0, PixelLoc::new(4, 4), None).unwrap();
        let up = strongest_neighbor(&img, &flags, &center, 1).unwrap();
        let down = strongest_neighbor(&img, &flags, &center, -1).unwrap();
        // The walk stays on the edge column, moving vertically
        assert_eq!(up.loc.x, 4);
        assert_eq!(down.loc.x, 4);
        assert_ne!(up.loc.y, down.loc.y);
    }

    #[test]
    fn test_seek_edge() {
        let img = vertical_edge();
        let flags = FlagGrid::new(9, 9);
        assert!(seek_edge(&img, &flags, PixelLoc::new(4, 4)).is_some());
        assert!(seek_edge(&img, &flags, PixelLoc::new(7, 4)).is_none());
    }
}
