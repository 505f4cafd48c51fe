//! Synthetic ECC200 renderer shared by the integration tests and benches

#![allow(dead_code)]

use rust_dmtx::SymbolSize;
use rust_dmtx::decoder::placement::{MODULE_ON, render_codewords};
use rust_dmtx::decoder::reed_solomon::encode_symbol;

/// Rendering parameters for one symbol
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    /// Pixels per module side
    pub module_px: usize,
    /// Light border around the symbol in pixels
    pub quiet_px: usize,
    /// Counter-clockwise rotation in degrees
    pub angle_deg: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            module_px: 8,
            quiet_px: 32,
            angle_deg: 0.0,
        }
    }
}

/// ASCII-encodation codewords for `text`, including the pad sequence
pub fn ascii_codewords(text: &str, data_words: usize) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut words = Vec::with_capacity(data_words);
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            words.push(130 + (b - b'0') * 10 + (bytes[i + 1] - b'0'));
            i += 2;
        } else {
            words.push(b + 1);
            i += 1;
        }
    }
    assert!(words.len() <= data_words, "{text} does not fit");
    pad_codewords(&mut words, data_words);
    words
}

/// Fill `words` up to `data_words` with the randomized pad sequence
pub fn pad_codewords(words: &mut Vec<u8>, data_words: usize) {
    if words.len() < data_words {
        words.push(129);
    }
    while words.len() < data_words {
        let position = words.len() + 1;
        let mut pad = 129 + (149 * position) % 253 + 1;
        if pad > 254 {
            pad -= 254;
        }
        words.push(pad as u8);
    }
}

/// Whether the module at symbol (`row`, `col`) is dark; row 0 is the solid
/// bottom finder bar, column 0 the solid left bar
pub fn module_on(size: &SymbolSize, mapping: &[u8], row: usize, col: usize) -> bool {
    let (block_rows, block_cols) = (size.region_rows + 2, size.region_cols + 2);
    let (rr, rc) = (row % block_rows, col % block_cols);
    if rr == 0 || rc == 0 {
        return true;
    }
    if rr == block_rows - 1 {
        return col % 2 == 0;
    }
    if rc == block_cols - 1 {
        return row % 2 == 0;
    }
    let map_row_up = (row / block_rows) * size.region_rows + rr - 1;
    let map_col = (col / block_cols) * size.region_cols + rc - 1;
    let map_row = size.mapping_rows() - 1 - map_row_up;
    mapping[map_row * size.mapping_cols() + map_col] & MODULE_ON != 0
}

/// Mapping matrix for `data_words` with the error words appended
pub fn symbol_mapping(size: &SymbolSize, data_words: &[u8]) -> Vec<u8> {
    render_codewords(size, &encode_symbol(size, data_words))
}

/// Grayscale canvas (top row first) holding one or more symbols
pub struct Canvas {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width * height],
        }
    }

    /// Draw a symbol whose unrotated bottom-left corner sits at
    /// (`left`, `bottom`) in top-down image coordinates; rotation is about
    /// the symbol centre
    pub fn draw(&mut self, size: &SymbolSize, mapping: &[u8], left: f64, bottom: f64, layout: &Layout) {
        let m = layout.module_px as f64;
        let (sym_w, sym_h) = (size.cols as f64 * m, size.rows as f64 * m);
        let (cx, cy) = (left + sym_w / 2.0, bottom - sym_h / 2.0);
        let (sin, cos) = layout.angle_deg.to_radians().sin_cos();

        for y in 0..self.height {
            for x in 0..self.width {
                // y-up offsets from the symbol centre
                let dx = x as f64 + 0.5 - cx;
                let dy = cy - (y as f64 + 0.5);
                let u = dx * cos + dy * sin + sym_w / 2.0;
                let v = -dx * sin + dy * cos + sym_h / 2.0;
                if u < 0.0 || v < 0.0 || u >= sym_w || v >= sym_h {
                    continue;
                }
                let col = (u / m) as usize;
                let row = (v / m) as usize;
                if module_on(size, mapping, row, col) {
                    self.pixels[y * self.width + x] = 0;
                }
            }
        }
    }

    /// Replicate the gray plane into packed RGB
    pub fn to_rgb(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&v| [v, v, v]).collect()
    }
}

/// A single symbol with `layout.quiet_px` of margin, centred on its canvas
pub fn render_single(size: &SymbolSize, data_words: &[u8], layout: &Layout) -> Canvas {
    let m = layout.module_px as f64;
    let (sym_w, sym_h) = (size.cols as f64 * m, size.rows as f64 * m);
    let diag = (sym_w * sym_w + sym_h * sym_h).sqrt();
    let (span_w, span_h) = if layout.angle_deg == 0.0 { (sym_w, sym_h) } else { (diag, diag) };
    let width = span_w.ceil() as usize + 2 * layout.quiet_px;
    let height = span_h.ceil() as usize + 2 * layout.quiet_px;

    let mut canvas = Canvas::new(width, height);
    let left = (width as f64 - sym_w) / 2.0;
    let bottom = (height as f64 + sym_h) / 2.0;
    let mapping = symbol_mapping(size, data_words);
    canvas.draw(size, &mapping, left, bottom, layout);
    canvas
}
