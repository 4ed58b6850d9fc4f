//! sizefit CLI - compress an image to a target file size
//!
//! Loads one image, searches encoder quality for the largest output that fits
//! `--target-kb`, and writes `{out-dir}/{stem}_out.{ext}`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};

use sizefit::{compress_file, BackgroundColor, CompressionRequest, OutputFormat, SizeFitError};

// jemalloc is not supported on MSVC targets.
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Compress an image to a target file size while maximizing quality.
#[derive(Parser, Debug)]
#[command(name = "sizefit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image path
    #[arg(long, value_name = "PATH")]
    input: PathBuf,

    /// Output format: jpg, png or webp
    #[arg(long, value_name = "FORMAT")]
    out_fmt: String,

    /// Target size in KB (1 KB = 1024 bytes)
    #[arg(long, value_name = "KB")]
    target_kb: u32,

    /// Output directory
    #[arg(long, default_value = "./output", value_name = "DIR")]
    out_dir: PathBuf,

    /// Background color used when flattening transparency for JPEG
    #[arg(long, default_value = "#ffffff", value_name = "COLOR")]
    bg: String,

    /// Lowest quality the search may use
    #[arg(long, default_value_t = sizefit::request::DEFAULT_Q_MIN)]
    q_min: u8,

    /// Highest quality the search may use
    #[arg(long, default_value_t = sizefit::request::DEFAULT_Q_MAX)]
    q_max: u8,

    /// Embed the source ICC profile in the output
    #[arg(long)]
    keep_icc: bool,

    /// Encode the lowest and highest quality concurrently
    #[arg(long)]
    parallel_probes: bool,

    /// Print the result metadata as JSON
    #[arg(long)]
    json: bool,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} ({})", e, e.category().as_str());
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), SizeFitError> {
    let format: OutputFormat = args.out_fmt.parse()?;
    let background = BackgroundColor::parse(&args.bg)?;
    let request = CompressionRequest::builder(format, args.target_kb)
        .quality_bounds(args.q_min, args.q_max)
        .background(background)
        .keep_icc(args.keep_icc)
        .parallel_probes(args.parallel_probes)
        .build()?;
    debug!("{request:?}");

    let (path, result) = compress_file(&args.input, &args.out_dir, &request)?;

    println!("Output: {}", path.display());
    if args.json {
        let report = serde_json::to_string_pretty(&result.report()).map_err(|e| {
            SizeFitError::internal_panic(format!("failed to serialize report: {e}"))
        })?;
        println!("{report}");
    } else {
        println!("{result}");
    }
    Ok(())
}
