/// Luminance conversion for packed 8-bit images
/// Y = 0.299*R + 0.587*G + 0.114*B
/// Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8
use rayon::prelude::*;

/// Coefficients for luminance conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: i32 = 76;
const COEF_G: i32 = 150;
const COEF_B: i32 = 29;

/// Below this many pixels the parallel path isn't worth the thread hand-off
const PARALLEL_MIN_PIXELS: usize = 256 * 256;

#[inline]
fn luma(px: &[u8]) -> u8 {
    match px.len() {
        0 => 0,
        1 | 2 => px[0],
        _ => {
            let lum = (COEF_R * px[0] as i32 + COEF_G * px[1] as i32 + COEF_B * px[2] as i32) >> 8;
            lum.min(255) as u8
        }
    }
}

/// Convert a packed image with `channels` bytes per pixel to luminance
///
/// One and two channel images (gray, gray+alpha) copy the first channel;
/// three and four channel images (RGB, RGBA) are weighted, ignoring alpha.
pub fn to_luma(pixels: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let pixel_count = width * height;
    if channels == 0 {
        return vec![0; pixel_count];
    }
    pixels
        .chunks_exact(channels)
        .take(pixel_count)
        .map(luma)
        .collect()
}

/// Convert RGB image to luminance
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_luma(rgb, width, height, 3)
}

/// Convert RGBA image to luminance (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_luma(rgba, width, height, 4)
}

/// Row-parallel variant of [`to_luma`]
/// Small images fall back to the sequential path
pub fn to_luma_parallel(pixels: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let pixel_count = width * height;
    if pixel_count < PARALLEL_MIN_PIXELS || channels == 0 || width == 0 {
        return to_luma(pixels, width, height, channels);
    }
    let mut gray = vec![0u8; pixel_count];

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * channels;
        let src = &pixels[row_start..row_start + width * channels];
        for (dst, px) in row.iter_mut().zip(src.chunks_exact(channels)) {
            *dst = luma(px);
        }
    });

    gray
}

/// Split a packed image into one plane per channel
///
/// Edge seeding probes every plane, so colour symbols printed in a single
/// channel are still found.
pub fn split_planes(pixels: &[u8], width: usize, height: usize, channels: usize) -> Vec<Vec<u8>> {
    let pixel_count = width * height;
    let mut planes = vec![Vec::with_capacity(pixel_count); channels];
    for px in pixels.chunks_exact(channels.max(1)).take(pixel_count) {
        for (plane, &v) in planes.iter_mut().zip(px) {
            plane.push(v);
        }
    }
    planes
}
