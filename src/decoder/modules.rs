/// Module sampling: decide every data module's colour from a fitted region
///
/// Each data region is swept in four directions starting from its known
/// border modules. A module that stays "on" relative to its predecessor
/// earns a vote weighted by how close the sweep started, and the module is
/// on when it collects at least half of the possible weight.
use crate::decoder::placement::{MODULE_ASSIGNED, MODULE_ON};
use crate::detector::region::Region;
use crate::utils::image::LumaImage;

/// Sweep direction over a data region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    Up,
    Left,
    Down,
    Right,
}

impl Sweep {
    fn horizontal(self) -> bool {
        matches!(self, Sweep::Left | Sweep::Right)
    }

    fn travel_step(self) -> i32 {
        match self {
            Sweep::Up | Sweep::Right => 1,
            Sweep::Left | Sweep::Down => -1,
        }
    }
}

/// Vote accumulator for one data region, indexed `[map_row][map_col]`
struct Tally {
    cells: Vec<i32>,
    width: usize,
}

impl Tally {
    fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![0; width * height],
            width,
        }
    }

    fn add(&mut self, row: i32, col: i32, weight: i32) {
        if row >= 0 && col >= 0 && (col as usize) < self.width {
            if let Some(cell) = self.cells.get_mut(row as usize * self.width + col as usize) {
                *cell += weight;
            }
        }
    }

    fn get(&self, row: usize, col: usize) -> i32 {
        self.cells[row * self.width + col]
    }
}

/// Build the mapping matrix (row 0 at the top) for `region`
///
/// Every module comes back flagged [`MODULE_ASSIGNED`], ready for codeword
/// extraction.
pub fn populate_array(image: &LumaImage, region: &Region) -> Vec<u8> {
    let size = region.size;
    let map_width = size.region_cols;
    let map_height = size.region_rows;
    let weight_factor = (2 * (map_height + map_width + 2)) as f64;

    let mut modules = vec![0u8; size.mapping_rows() * size.mapping_cols()];

    for y_region in 0..size.vert_regions {
        let y_origin = (y_region * (map_height + 2) + 1) as i32;
        for x_region in 0..size.horiz_regions {
            let x_origin = (x_region * (map_width + 2) + 1) as i32;

            let mut tally = Tally::new(map_width, map_height);
            for sweep in [Sweep::Up, Sweep::Left, Sweep::Down, Sweep::Right] {
                tally_module_jumps(image, region, &mut tally, x_origin, y_origin, sweep);
            }

            for map_row in 0..map_height {
                for map_col in 0..map_width {
                    // Symbol rows count up from the finder bar, the array counts down
                    let row = size.vert_regions * map_height - (y_region * map_height + map_row) - 1;
                    let col = x_region * map_width + map_col;
                    let idx = row * size.horiz_regions * map_width + col;

                    let on = tally.get(map_row, map_col) as f64 / weight_factor >= 0.5;
                    modules[idx] = MODULE_ASSIGNED | if on { MODULE_ON } else { 0 };
                }
            }
        }
    }

    modules
}

fn tally_module_jumps(
    image: &LumaImage,
    region: &Region,
    tally: &mut Tally,
    x_origin: i32,
    y_origin: i32,
    sweep: Sweep,
) {
    let size = region.size;
    let (map_width, map_height) = (size.region_cols as i32, size.region_rows as i32);
    let travel_step = sweep.travel_step();

    // Lines run across the sweep, travel runs along it
    let (extent, line_start, line_stop, travel_start, travel_stop) = if sweep.horizontal() {
        (
            map_width,
            y_origin,
            y_origin + map_height,
            if travel_step == 1 { x_origin - 1 } else { x_origin + map_width },
            if travel_step == 1 { x_origin + map_width } else { x_origin - 1 },
        )
    } else {
        (
            map_height,
            x_origin,
            x_origin + map_width,
            if travel_step == 1 { y_origin - 1 } else { y_origin + map_height },
            if travel_step == 1 { y_origin + map_height } else { y_origin - 1 },
        )
    };
    let to_row_col = |line: i32, travel: i32| {
        if sweep.horizontal() { (line, travel) } else { (travel, line) }
    };

    let threshold = region.jump_threshold();

    for line in line_start..line_stop {
        let mut travel = travel_start;
        let (row, col) = to_row_col(line, travel);
        let mut t_module = region.on_strength(region.module_color(image, row, col));

        // Leading border module: finder bars are solid, calibration bars alternate
        let mut on = travel_step == 1 || line & 1 == 0;
        let mut weight = extent;

        loop {
            travel += travel_step;
            if travel == travel_stop {
                break;
            }

            let t_prev = t_module;
            let (row, col) = to_row_col(line, travel);
            t_module = region.on_strength(region.module_color(image, row, col));

            on = if on {
                t_module >= t_prev - threshold
            } else {
                t_module > t_prev + threshold
            };

            if on {
                tally.add(row - y_origin, col - x_origin, 2 * weight);
            }
            weight -= 1;
        }
    }
}
