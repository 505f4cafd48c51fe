use crate::config::DecodeOptions;
use crate::models::DataMatrix;
use crate::{DecodeError, decode_all};
use image::GenericImageView;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn max_dim_from_env() -> Option<u32> {
    match env::var("DMTX_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image as RGB bytes along with its dimensions.
///
/// Images larger than `DMTX_MAX_DIM` on either side are scaled down first.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<(Vec<u8>, usize, usize), image::ImageError> {
    let img = image::open(path)?;
    let rgb = match max_dim_from_env() {
        Some(max_dim) if img.dimensions().0.max(img.dimensions().1) > max_dim => img
            .resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
            .to_rgb8(),
        _ => img.to_rgb8(),
    };
    let (width, height) = rgb.dimensions();
    Ok((rgb.into_raw(), width as usize, height as usize))
}

/// Decode every symbol in an RGB image.
pub fn decode_rgb(
    rgb: &[u8],
    width: usize,
    height: usize,
    options: &DecodeOptions,
) -> Result<Vec<DataMatrix>, DecodeError> {
    decode_all(rgb, width, height, 3, options)
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &[u8]) -> GrayStats {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in gray {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    let avg = if gray.is_empty() {
        0
    } else {
        (sum / gray.len() as u64) as u8
    };
    GrayStats { min, max, avg }
}

/// Expected payloads for a dataset image, read from the `.txt` file beside it.
///
/// One payload per non-empty line; lines starting with `#` are comments.
/// Returns an empty list when no label file exists.
pub fn expected_payloads<P: AsRef<Path>>(image_path: P) -> Vec<String> {
    let label = image_path.as_ref().with_extension("txt");
    let Ok(content) = fs::read_to_string(label) else {
        return Vec::new();
    };
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Default dataset root from environment variables.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("DMTX_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Default dataset limit from environment variables.
///
/// Returns `None` (full dataset) when `DMTX_BENCH_LIMIT` is unset or `0`.
pub fn bench_limit_from_env() -> Option<usize> {
    env::var("DMTX_BENCH_LIMIT")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&v| v != 0)
}

/// Sorted image paths under `root`, truncated to `limit`.
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    matches!(
                        ext.to_ascii_lowercase().as_str(),
                        "png" | "jpg" | "jpeg" | "bmp" | "gif" | "tif" | "tiff" | "pnm"
                    )
                })
                .unwrap_or(false);
            if is_image {
                images.push(path);
            }
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX epoch")
            .as_nanos();
        let sequence = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("rust_dmtx_tools_{nanos}_{sequence}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    #[test]
    fn expected_payloads_skip_comments() {
        let dir = temp_dir();
        fs::write(dir.join("a.txt"), "# labels\nHELLO\n\n123456\n").unwrap();
        assert_eq!(expected_payloads(dir.join("a.png")), vec!["HELLO", "123456"]);
        assert!(expected_payloads(dir.join("missing.png")).is_empty());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn dataset_iter_finds_nested_images() {
        let dir = temp_dir();
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.png"), b"").unwrap();
        fs::write(dir.join("nested/a.JPG"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();

        let all: Vec<PathBuf> = dataset_iter(&dir, None).collect();
        assert_eq!(all.len(), 2);
        assert_eq!(dataset_iter(&dir, Some(1)).count(), 1);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn grayscale_stats_basic() {
        let stats = grayscale_stats(&[10, 20, 30]);
        assert_eq!((stats.min, stats.max, stats.avg), (10, 30, 20));
    }
}
