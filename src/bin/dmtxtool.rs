use clap::{Parser, Subcommand, ValueEnum};
use rust_dmtx::tools::{
    bench_limit_from_env, dataset_iter, dataset_root_from_env, decode_rgb, expected_payloads,
    grayscale_stats, load_rgb,
};
use rust_dmtx::utils::grayscale::rgb_to_grayscale;
use rust_dmtx::{DecodeOptions, SizeRequest, SymbolSize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "dmtxtool", version, about = "Data Matrix decoding tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    Auto,
    Square,
    Rect,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Symbol shapes to try
    #[arg(long, value_enum, default_value = "auto")]
    shape: Shape,
    /// Only try one size, given as ROWSxCOLS (e.g. 16x16)
    #[arg(long)]
    size: Option<String>,
    /// Smallest scan-grid extent in pixels
    #[arg(long)]
    scan_gap: Option<usize>,
    /// Stop searching after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Maximum number of symbols per image
    #[arg(long, default_value_t = 16)]
    max: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Decode every symbol in a single image
    Decode {
        #[arg(long)]
        image: PathBuf,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Print grayscale statistics for an image
    Stats {
        #[arg(long)]
        image: PathBuf,
    },
    /// Compute reading rate on a labelled dataset
    ReadingRate {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        search: SearchArgs,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Decode { image, search } => search_options(&search).map(|opts| decode_cmd(&image, &opts)),
        Command::Stats { image } => {
            stats_cmd(&image);
            Ok(())
        }
        Command::ReadingRate {
            root,
            limit,
            search,
        } => search_options(&search).map(|opts| reading_rate_cmd(root, limit, &opts)),
    };
    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn search_options(args: &SearchArgs) -> Result<DecodeOptions, String> {
    let size_request = match &args.size {
        Some(spec) => SizeRequest::Fixed(parse_size(spec)?.index),
        None => match args.shape {
            Shape::Auto => SizeRequest::ShapeAuto,
            Shape::Square => SizeRequest::SquareAuto,
            Shape::Rect => SizeRequest::RectAuto,
        },
    };

    let mut opts = DecodeOptions::default()
        .with_size_request(size_request)
        .with_max_symbols(args.max);
    if let Some(gap) = args.scan_gap {
        opts = opts.with_scan_gap(gap);
    }
    if let Some(ms) = args.timeout_ms {
        opts = opts.with_timeout(Some(Duration::from_millis(ms)));
    }
    Ok(opts)
}

fn parse_size(spec: &str) -> Result<&'static SymbolSize, String> {
    let (rows, cols) = spec
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("size must look like ROWSxCOLS, got {spec}"))?;
    let rows = rows.trim().parse::<usize>().map_err(|e| format!("bad row count: {e}"))?;
    let cols = cols.trim().parse::<usize>().map_err(|e| format!("bad column count: {e}"))?;
    SymbolSize::from_dimensions(rows, cols).ok_or_else(|| format!("no ECC200 size {rows}x{cols}"))
}

fn decode_cmd(image: &Path, opts: &DecodeOptions) {
    let (pixels, width, height) = match load_rgb(image) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Failed to load image {}: {}", image.display(), err);
            return;
        }
    };

    let start = Instant::now();
    let results = match decode_rgb(&pixels, width, height, opts) {
        Ok(results) => results,
        Err(err) => {
            eprintln!("Failed to decode {}: {}", image.display(), err);
            return;
        }
    };
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        symbols = results.len(),
        "decoded {}",
        image.display()
    );

    println!("Image: {} ({}x{})", image.display(), width, height);
    println!("Found {} symbols", results.len());
    for (i, dm) in results.iter().enumerate() {
        let (min, max) = dm.bounding_box();
        println!(
            "  Symbol {}: size={}x{}, angle={:.1}deg, box=({:.0},{:.0})-({:.0},{:.0}), content={}",
            i,
            dm.size.rows,
            dm.size.cols,
            dm.angle.to_degrees(),
            min.x,
            min.y,
            max.x,
            max.y,
            dm.content
        );
    }
}

fn stats_cmd(image: &Path) {
    let (pixels, width, height) = match load_rgb(image) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Failed to load image {}: {}", image.display(), err);
            return;
        }
    };

    let gray = rgb_to_grayscale(&pixels, width, height);
    let stats = grayscale_stats(&gray);
    println!("Image: {} ({}x{})", image.display(), width, height);
    println!(
        "Grayscale range: {}-{}, average: {}",
        stats.min, stats.max, stats.avg
    );
}

fn reading_rate_cmd(root: Option<PathBuf>, limit: Option<usize>, opts: &DecodeOptions) {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(bench_limit_from_env);

    let mut images = 0usize;
    let mut expected_total = 0usize;
    let mut found_total = 0usize;
    let start = Instant::now();

    for path in dataset_iter(&root, limit) {
        let (pixels, width, height) = match load_rgb(&path) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };
        images += 1;

        let expected = expected_payloads(&path);
        let decoded = decode_rgb(&pixels, width, height, opts).unwrap_or_default();
        let found = expected
            .iter()
            .filter(|want| decoded.iter().any(|dm| &dm.content == *want))
            .count();
        tracing::debug!(
            expected = expected.len(),
            found,
            decoded = decoded.len(),
            "{}",
            path.display()
        );

        expected_total += expected.len();
        found_total += found;
    }

    let rate = if expected_total == 0 {
        0.0
    } else {
        found_total as f64 / expected_total as f64 * 100.0
    };
    println!("Dataset: {}", root.display());
    println!("Images: {images}");
    println!("Symbols: {found_total}/{expected_total} ({rate:.2}%)");
    println!("Elapsed: {:.2}s", start.elapsed().as_secs_f64());
}
