use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tinyalsa_harness::{
    AudioTestSession, Config, LogListener, Operation, OperationKind, SimEngine, SimEngineConfig,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "tinyalsa-harness",
    about = "Hardware audio path test harness (DMIC / line-in record and playback)"
)]
struct Cli {
    /// Config file name, without extension
    #[arg(long, default_value = "config/tinyalsa-harness")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the digital microphone
    DmicRecord {
        /// Output WAV path (default: <music_dir>/dmic.wav)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Record duration in seconds
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Play back the DMIC recording
    DmicPlay {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Record from the analog line-in
    LineinRecord {
        /// Output WAV path (default: <music_dir>/amic.wav)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Record duration in seconds
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Play back the line-in recording
    LineinPlay {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn build_operation(command: Command, music_dir: &PathBuf, default_secs: u32) -> Operation {
    let op = |kind: OperationKind, file: Option<PathBuf>, duration: Option<u32>| {
        let path = file.unwrap_or_else(|| music_dir.join(kind.default_file_name()));
        if kind.is_record() {
            Operation::record(kind, path, duration.unwrap_or(default_secs))
        } else {
            Operation::playback(kind, path)
        }
    };

    match command {
        Command::DmicRecord { file, duration } => op(OperationKind::DmicRecord, file, duration),
        Command::DmicPlay { file } => op(OperationKind::DmicPlayback, file, None),
        Command::LineinRecord { file, duration } => {
            op(OperationKind::LineinRecord, file, duration)
        }
        Command::LineinPlay { file } => op(OperationKind::LineinPlayback, file, None),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let music_dir = PathBuf::from(&cfg.audio.music_dir);
    std::fs::create_dir_all(&music_dir)
        .with_context(|| format!("Failed to create music directory {}", music_dir.display()))?;

    let engine = Arc::new(SimEngine::new(SimEngineConfig {
        tick: Duration::from_millis(cfg.engine.tick_ms),
    }));
    let session = AudioTestSession::new(engine);
    session.set_listener(Some(Arc::new(LogListener)));

    let op = build_operation(cli.command, &music_dir, cfg.audio.record_duration_secs);
    info!("Session {}: {} -> {}", session.id(), op.kind, op.file_path.display());

    let code = session.run(op).await;
    session.set_listener(None);

    info!("Session stats: {}", serde_json::to_string(&session.stats())?);

    if code != 0 {
        error!("Test failed (code {}): {}", code, session.last_error());
        std::process::exit(1);
    }

    info!("Test passed");
    Ok(())
}
