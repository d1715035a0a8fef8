//! flipbuf-sim: run the bouncing-box demo against simulated display hardware.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use flipbuf_core::{DisplayConfig, COPY_TIMEOUT_MS};
use flipbuf_pc::SimConfig;

#[derive(Parser)]
#[command(name = "flipbuf-sim")]
#[command(about = "Simulate the double-buffered LCD flush pipeline on the host", long_about = None)]
#[command(version)]
struct Cli {
    /// Panel width in pixels
    #[arg(long, default_value_t = 800)]
    width: u16,

    /// Panel height in pixels
    #[arg(long, default_value_t = 480)]
    height: u16,

    /// Number of frames to render
    #[arg(short, long, default_value_t = 120)]
    frames: u32,

    /// Edge length of the bouncing box
    #[arg(long, default_value_t = 48)]
    box_size: u16,

    /// Simulated duration of one accelerator transfer
    #[arg(long, default_value_t = 0)]
    engine_latency_ms: u32,

    /// Stall the accelerator before this frame
    #[arg(long)]
    stall_at_frame: Option<u32>,

    /// Accelerator completion timeout
    #[arg(long, default_value_t = COPY_TIMEOUT_MS)]
    timeout_ms: u32,

    /// Write the final front surface to this PNG file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log every flush
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let config = SimConfig {
        display: DisplayConfig::new(cli.width, cli.height).with_copy_timeout(cli.timeout_ms),
        frames: cli.frames,
        box_size: cli.box_size,
        engine_latency_ms: cli.engine_latency_ms,
        stall_at_frame: cli.stall_at_frame,
        dump: cli.output,
    };

    let report = flipbuf_pc::run(&config)
        .with_context(|| format!("simulation at {}x{} failed", cli.width, cli.height))?;

    eprintln!(
        "Success: {} frames presented ({} copied, {} skipped, {} pixels)",
        report.stats.frames,
        report.stats.areas_copied,
        report.stats.areas_skipped,
        report.stats.pixels_copied
    );
    Ok(())
}
