use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::task;
use tracing::{info, Level};
use tracing_subscriber;

use camveil::{
    config::ConfigStore,
    device::{self, FfmpegCapture, FfmpegSink},
    pipeline::PipelineEngine,
    segment::ChromaKeySegmenter,
};

#[derive(Parser)]
#[command(
    name = "camveil",
    version,
    about = "Replace your webcam background in real time",
    long_about = "Camveil captures frames from a real camera, separates the subject from \
the background with a segmentation collaborator, composites a configurable replacement \
background and overlay, and re-emits the result on a virtual camera device."
)]
struct Cli {
    /// Settings file, hot-reloaded while running
    #[arg(short, long, default_value = "settings.toml")]
    config: PathBuf,

    /// Chroma key color for the built-in segmenter, as R,G,B
    #[arg(long, value_delimiter = ',', default_values_t = [0u8, 255, 0])]
    key_color: Vec<u8>,

    /// Chroma key tolerance (0.0-1.0)
    #[arg(long, default_value_t = 0.35)]
    key_tolerance: f32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting camveil v{}", env!("CARGO_PKG_VERSION"));
    info!("Settings: {:?}", cli.config);

    if !device::check_ffmpeg_available() {
        return Err(camveil::error::DeviceError::FfmpegMissing.into());
    }

    // Load settings once up front to pick the devices and resolution
    let mut config = ConfigStore::new(&cli.config);
    if !config.reload() {
        info!("No settings loaded from {:?}, using defaults", cli.config);
    }
    let settings = config.settings().clone();

    let width = settings.width.unwrap_or(640);
    let height = settings.height.unwrap_or(480);

    let source = FfmpegCapture::open(&settings.real_video_device, width, height)?;
    let sink = FfmpegSink::open(&settings.virtual_video_device, width, height)?;

    let key: [u8; 3] = cli
        .key_color
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("--key-color takes exactly three values (R,G,B)"))?;
    let segmenter = ChromaKeySegmenter::new(key, cli.key_tolerance);

    let mut engine = PipelineEngine::new(
        config,
        Box::new(source),
        Box::new(sink),
        Box::new(segmenter),
    );

    // Ctrl-C raises the flag; the running iteration finishes first
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            flag.store(true, Ordering::Relaxed);
        }
    });

    task::spawn_blocking(move || engine.run(&interrupt)).await??;

    info!("Stopped");
    Ok(())
}
