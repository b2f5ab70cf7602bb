//! screenreel CLI
//!
//! Thin process surface: parse the resolved recording configuration, run
//! one session, report the outcome. SIGINT/SIGTERM stop the recording
//! cleanly instead of killing the process mid-write.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use screenreel::recorder::{signals, SessionController, SessionEvent};
use screenreel::writer::ContainerKind;
use screenreel::{platform, RecordingConfig, SessionStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ContainerArg {
    Mp4,
    Mov,
}

impl From<ContainerArg> for ContainerKind {
    fn from(arg: ContainerArg) -> Self {
        match arg {
            ContainerArg::Mp4 => ContainerKind::Mp4,
            ContainerArg::Mov => ContainerKind::Mov,
        }
    }
}

/// Record the screen to a finalized container file
#[derive(Parser, Debug)]
#[command(name = "screenreel", version, about)]
struct Cli {
    /// Output file path
    output: PathBuf,

    /// Container format
    #[arg(long, value_enum, default_value_t = ContainerArg::Mp4)]
    container: ContainerArg,

    /// Capture width in pixels
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Capture height in pixels
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Target frame rate
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Target video bitrate in bits per second
    #[arg(long, default_value_t = 8_000_000)]
    bitrate: u64,

    /// Capture system audio
    #[arg(long)]
    system_audio: bool,

    /// Capture microphone
    #[arg(long)]
    microphone: bool,

    /// Audio channel count
    #[arg(long, default_value_t = 2)]
    audio_channels: u16,

    /// Audio sample rate in Hz
    #[arg(long, default_value_t = 48_000)]
    audio_sample_rate: u32,

    /// Stop automatically once the output file reaches this size
    #[arg(long)]
    max_size_mb: Option<u64>,

    /// Percentage of the size limit at which a warning is printed
    #[arg(long, default_value_t = 90)]
    warning_percent: u8,

    /// Print the session outcome as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screenreel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting screenreel v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let config = RecordingConfig {
        output_path: cli.output,
        container: cli.container.into(),
        width: cli.width,
        height: cli.height,
        frame_rate: cli.fps,
        bitrate: cli.bitrate,
        capture_system_audio: cli.system_audio,
        capture_microphone: cli.microphone,
        audio_channels: cli.audio_channels,
        audio_sample_rate: cli.audio_sample_rate,
        max_size_bytes: cli.max_size_mb.map(|mb| mb * 1024 * 1024),
        warning_percent: cli.warning_percent,
    };

    let source = platform::create_source(&config).context("no capture backend available")?;
    let writer = platform::create_writer(&config).context("could not create media writer")?;

    let controller = Arc::new(SessionController::configure(config, writer, source)?);

    signals::spawn_signal_listener(controller.trigger_sender());

    // Surface size warnings on stderr while recording continues.
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::SizeWarning { bytes, threshold } => {
                    eprintln!(
                        "warning: output file is {} MiB (threshold {} MiB)",
                        bytes / (1024 * 1024),
                        threshold / (1024 * 1024)
                    );
                }
                SessionEvent::SizeLimitReached { limit, .. } => {
                    eprintln!(
                        "output file reached the {} MiB limit, stopping",
                        limit / (1024 * 1024)
                    );
                }
                _ => {}
            }
        }
    });

    let done = controller.start().await?;
    let outcome = done
        .await
        .context("session ended without reporting an outcome")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!(
            "{}: {} ({:.1}s, {} frames, {} audio samples)",
            match outcome.status {
                SessionStatus::Completed => "completed",
                SessionStatus::Failed => "failed",
            },
            outcome.output_path,
            outcome.duration_ms / 1000.0,
            outcome.counters.frames_written,
            outcome.counters.audio_samples_total,
        );
        if let Some(error) = &outcome.error {
            eprintln!("error: {}", error);
        }
    }

    if outcome.status == SessionStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}
