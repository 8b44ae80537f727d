use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use xv6fs::{BitmapMode, CheckOptions, FsError, Layout, RawImage};

mod report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Human,
    Json,
}

#[derive(Parser)]
#[command(
    name = "xv6fs_inspect",
    about = "Check an xv6 filesystem image for builder mistakes and print its tree"
)]
struct Cli {
    /// Path to the filesystem image.
    image: PathBuf,
    /// Fail when the free-block bitmap disagrees with the inodes.
    #[arg(long)]
    strict: bool,
    /// Print one absolute path per line instead of the indented tree.
    #[arg(long)]
    flat: bool,
    #[arg(long, default_value_t = Layout::XV6.block_size)]
    block_size: usize,
    /// Inode table capacity the image was built with.
    #[arg(long, default_value_t = Layout::XV6.ninodes)]
    ninodes: u32,
    #[arg(long, default_value_t = Layout::XV6.nlog)]
    nlog: u32,
    /// Log output format; the level comes from `RUST_LOG` (default `warn`).
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.log_format).and_then(|()| run(&cli)) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match format {
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init(),
    }
    .map_err(|err| anyhow::anyhow!("failed to initialize logger: {err}"))
}

fn run(cli: &Cli) -> Result<()> {
    let layout = Layout::new(cli.block_size, cli.ninodes, cli.nlog)?;
    let image = RawImage::open(&cli.image, layout.block_size)
        .with_context(|| format!("failed to load {}", cli.image.display()))?;
    info!(path = %cli.image.display(), blocks = image.block_count(), "image loaded");

    let options = CheckOptions {
        layout,
        bitmap: if cli.strict {
            BitmapMode::Strict
        } else {
            BitmapMode::Report
        },
    };

    let mut out = io::stdout().lock();
    let inspection = match xv6fs::inspect(&image, &options) {
        Ok(inspection) => inspection,
        Err(FsError::BitmapMismatch(mismatches)) => {
            for m in &mismatches {
                report::mismatch(&mut out, &image, m)?;
            }
            out.flush()?;
            return Err(FsError::BitmapMismatch(mismatches))
                .with_context(|| format!("{} failed the strict check", cli.image.display()));
        }
        Err(err) => {
            return Err(err).with_context(|| format!("{} is malformed", cli.image.display()));
        }
    };

    report::superblock(&mut out, &inspection.superblock)?;
    for m in &inspection.mismatches {
        report::mismatch(&mut out, &image, m)?;
    }

    if cli.flat {
        report::flat(&mut out, &inspection.tree)?;
    } else {
        report::tree(&mut out, &inspection.tree, &inspection.inodes)?;
    }
    report::summary(&mut out, &inspection)?;
    out.flush()?;

    Ok(())
}
