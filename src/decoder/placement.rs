//! ECC200 module placement
//!
//! Maps the linear codeword stream onto the mapping matrix (the symbol with
//! its finder and calibration borders removed) along the standard diagonal
//! zig-zag. The walk is shared by both directions: a module already flagged
//! [`MODULE_ASSIGNED`] yields a bit into the codeword, any other module
//! receives the codeword's bit.

use crate::models::SymbolSize;

/// Module colour bits
pub const MODULE_ON: u8 = 0x07;
/// Module holds a sampled (or previously written) colour
pub const MODULE_ASSIGNED: u8 = 0x10;
/// Module has been reached by the placement walk
pub const MODULE_VISITED: u8 = 0x20;

const BIT1: u8 = 0x80;
const BIT2: u8 = 0x40;
const BIT3: u8 = 0x20;
const BIT4: u8 = 0x10;
const BIT5: u8 = 0x08;
const BIT6: u8 = 0x04;
const BIT7: u8 = 0x02;
const BIT8: u8 = 0x01;

/// ECC200 placement walker over a `rows x cols` mapping matrix
pub struct Ecc200Placement<'a> {
    modules: &'a mut [u8],
    rows: i32,
    cols: i32,
}

impl<'a> Ecc200Placement<'a> {
    /// Walker over a zeroed mapping matrix of `rows x cols` modules
    pub fn new(modules: &'a mut [u8], rows: usize, cols: usize) -> Self {
        Self {
            modules,
            rows: rows as i32,
            cols: cols as i32,
        }
    }

    /// Walk the whole matrix, returning how many codewords were visited
    pub fn run(&mut self, codewords: &mut [u8]) -> usize {
        let (rows, cols) = (self.rows, self.cols);
        let mut chr = 0usize;
        let mut row = 4i32;
        let mut col = 0i32;

        loop {
            if row == rows && col == 0 {
                self.corner1(&mut codewords[chr]);
                chr += 1;
            } else if row == rows - 2 && col == 0 && cols % 4 != 0 {
                self.corner2(&mut codewords[chr]);
                chr += 1;
            } else if row == rows - 2 && col == 0 && cols % 8 == 4 {
                self.corner3(&mut codewords[chr]);
                chr += 1;
            } else if row == rows + 4 && col == 2 && cols % 8 == 0 {
                self.corner4(&mut codewords[chr]);
                chr += 1;
            }

            // Sweep upward diagonally
            loop {
                if row < rows && col >= 0 && !self.visited(row, col) {
                    self.utah(row, col, &mut codewords[chr]);
                    chr += 1;
                }
                row -= 2;
                col += 2;
                if row < 0 || col >= cols {
                    break;
                }
            }
            row += 1;
            col += 3;

            // Sweep downward diagonally
            loop {
                if row >= 0 && col < cols && !self.visited(row, col) {
                    self.utah(row, col, &mut codewords[chr]);
                    chr += 1;
                }
                row += 2;
                col -= 2;
                if row >= rows || col < 0 {
                    break;
                }
            }
            row += 3;
            col += 1;

            if row >= rows && col >= cols {
                break;
            }
        }

        // Sizes with leftover bits fix the bottom-right corner pattern
        let last = (rows * cols - 1) as usize;
        if self.modules[last] & MODULE_VISITED == 0 {
            self.modules[last] |= MODULE_ON;
            self.modules[last - cols as usize - 1] |= MODULE_ON;
        }

        chr
    }

    fn visited(&self, row: i32, col: i32) -> bool {
        self.modules[(row * self.cols + col) as usize] & MODULE_VISITED != 0
    }

    /// Standard 8-module "utah" shape with its lower-right corner at (row, col)
    fn utah(&mut self, row: i32, col: i32, codeword: &mut u8) {
        self.place(row - 2, col - 2, codeword, BIT1);
        self.place(row - 2, col - 1, codeword, BIT2);
        self.place(row - 1, col - 2, codeword, BIT3);
        self.place(row - 1, col - 1, codeword, BIT4);
        self.place(row - 1, col, codeword, BIT5);
        self.place(row, col - 2, codeword, BIT6);
        self.place(row, col - 1, codeword, BIT7);
        self.place(row, col, codeword, BIT8);
    }

    fn corner1(&mut self, cw: &mut u8) {
        let (r, c) = (self.rows, self.cols);
        self.place(r - 1, 0, cw, BIT1);
        self.place(r - 1, 1, cw, BIT2);
        self.place(r - 1, 2, cw, BIT3);
        self.place(0, c - 2, cw, BIT4);
        self.place(0, c - 1, cw, BIT5);
        self.place(1, c - 1, cw, BIT6);
        self.place(2, c - 1, cw, BIT7);
        self.place(3, c - 1, cw, BIT8);
    }

    fn corner2(&mut self, cw: &mut u8) {
        let (r, c) = (self.rows, self.cols);
        self.place(r - 3, 0, cw, BIT1);
        self.place(r - 2, 0, cw, BIT2);
        self.place(r - 1, 0, cw, BIT3);
        self.place(0, c - 4, cw, BIT4);
        self.place(0, c - 3, cw, BIT5);
        self.place(0, c - 2, cw, BIT6);
        self.place(0, c - 1, cw, BIT7);
        self.place(1, c - 1, cw, BIT8);
    }

    fn corner3(&mut self, cw: &mut u8) {
        let (r, c) = (self.rows, self.cols);
        self.place(r - 3, 0, cw, BIT1);
        self.place(r - 2, 0, cw, BIT2);
        self.place(r - 1, 0, cw, BIT3);
        self.place(0, c - 2, cw, BIT4);
        self.place(0, c - 1, cw, BIT5);
        self.place(1, c - 1, cw, BIT6);
        self.place(2, c - 1, cw, BIT7);
        self.place(3, c - 1, cw, BIT8);
    }

    fn corner4(&mut self, cw: &mut u8) {
        let (r, c) = (self.rows, self.cols);
        self.place(r - 1, 0, cw, BIT1);
        self.place(r - 1, c - 1, cw, BIT2);
        self.place(0, c - 3, cw, BIT3);
        self.place(0, c - 2, cw, BIT4);
        self.place(0, c - 1, cw, BIT5);
        self.place(1, c - 3, cw, BIT6);
        self.place(1, c - 2, cw, BIT7);
        self.place(1, c - 1, cw, BIT8);
    }

    fn place(&mut self, mut row: i32, mut col: i32, codeword: &mut u8, mask: u8) {
        if row < 0 {
            row += self.rows;
            col += 4 - ((self.rows + 4) % 8);
        }
        if col < 0 {
            col += self.cols;
            row += 4 - ((self.cols + 4) % 8);
        }

        let module = &mut self.modules[(row * self.cols + col) as usize];
        if *module & MODULE_ASSIGNED != 0 {
            if *module & MODULE_ON != 0 {
                *codeword |= mask;
            } else {
                *codeword &= 0xff ^ mask;
            }
        } else if *codeword & mask != 0 {
            *module |= MODULE_ON;
        }
        *module |= MODULE_VISITED;
    }
}

/// Read codewords out of a sampled mapping matrix
///
/// Every module is treated as assigned; `modules` is row-major with row 0 at
/// the top of the symbol.
pub fn extract_codewords(size: &SymbolSize, modules: &mut [u8]) -> Vec<u8> {
    for m in modules.iter_mut() {
        *m = (*m & MODULE_ON) | MODULE_ASSIGNED;
    }
    let mut codewords = vec![0u8; size.total_words()];
    Ecc200Placement::new(modules, size.mapping_rows(), size.mapping_cols()).run(&mut codewords);
    codewords
}

/// Write codewords into a fresh mapping matrix
pub fn render_codewords(size: &SymbolSize, codewords: &[u8]) -> Vec<u8> {
    let mut modules = vec![0u8; size.mapping_rows() * size.mapping_cols()];
    let mut words = codewords.to_vec();
    words.resize(size.total_words(), 0);
    Ecc200Placement::new(&mut modules, size.mapping_rows(), size.mapping_cols()).run(&mut words);
    modules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SYMBOL_SIZES;
    use proptest::prelude::*;

    #[test]
    fn test_every_module_visited() {
        for size in SYMBOL_SIZES.iter() {
            let mut modules = vec![0u8; size.mapping_rows() * size.mapping_cols()];
            let mut words = vec![0u8; size.total_words()];
            let count = Ecc200Placement::new(&mut modules, size.mapping_rows(), size.mapping_cols())
                .run(&mut words);
            assert_eq!(count, size.total_words(), "size {}x{}", size.rows, size.cols);

            let unvisited = modules.iter().filter(|&&m| m & MODULE_VISITED == 0).count();
            // Only the fixed 2x2 corner pattern may be left out
            assert!(unvisited == 0 || unvisited == 4, "size {}x{}", size.rows, size.cols);
        }
    }

    #[test]
    fn test_first_codeword_position() {
        // First utah shape sits at rows 2..=4, cols 0..=2 with its top bits
        // wrapped to the right edge
        let size = SymbolSize::from_dimensions(10, 10).unwrap();
        let modules = render_codewords(size, &[0x01]);
        let cols = size.mapping_cols();
        // BIT8 lands on (4, 0)
        let on: Vec<usize> = modules
            .iter()
            .enumerate()
            .filter(|(_, m)| **m & MODULE_ON != 0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(on, vec![4 * cols]);
    }

    proptest! {
        #[test]
        fn prop_placement_is_bijective(index in 0usize..30, seed in any::<u64>()) {
            let size = SymbolSize::from_index(index).unwrap();
            let words: Vec<u8> = (0..size.total_words())
                .map(|i| (seed.rotate_left(i as u32 % 64) ^ i as u64) as u8)
                .collect();
            let mut modules = render_codewords(size, &words);
            prop_assert_eq!(extract_codewords(size, &mut modules), words);
        }
    }
}
