use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use tempovox_app::config::AppConfig;
use tempovox_app::control::spawn_stdin_control;
use tempovox_app::runtime::{self, AppRuntimeOptions, AudioSourceConfig};
use tempovox_audio::{PlaybackMode, ResamplerQuality};
use tempovox_foundation::{AppState, ShutdownHandler, StateManager};
use tempovox_kws::TemplateBank;

#[derive(Parser)]
#[command(author, version, about = "Voice-commanded kitchen timer pipeline")]
struct Cli {
    /// Audio input device name
    #[arg(short = 'D', long, env = "TEMPOVOX_DEVICE")]
    device: Option<String>,
    /// Replay a WAV recording instead of capturing live audio
    #[arg(long)]
    wav: Option<PathBuf>,
    /// Replay faster than real time (WAV sources only)
    #[arg(long)]
    fast: bool,
    /// Template bank to load at startup
    #[arg(long, env = "TEMPOVOX_BANK")]
    bank: Option<PathBuf>,
    /// Configuration file (TOML)
    #[arg(long, env = "TEMPOVOX_CONFIG")]
    config: Option<PathBuf>,
    /// Resampler quality: fast, balanced, quality
    #[arg(long = "resampler-quality", default_value = "balanced")]
    resampler_quality: String,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "tempovox.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

fn parse_quality(raw: &str) -> ResamplerQuality {
    match raw.to_lowercase().as_str() {
        "fast" => ResamplerQuality::Fast,
        "quality" => ResamplerQuality::Quality,
        "balanced" => ResamplerQuality::Balanced,
        other => {
            tracing::warn!("unknown resampler quality '{other}', using balanced");
            ResamplerQuality::Balanced
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    init_logging()?;
    tracing::info!("starting TempoVox");

    let state_manager = StateManager::new();
    let shutdown = ShutdownHandler::new().install().await;

    let config = AppConfig::load(cli.config.as_deref())?;

    let bank = match &cli.bank {
        Some(path) => {
            let bank = TemplateBank::load(path)?;
            tracing::info!(
                tokens = bank.enrolled_tokens(),
                templates = bank.total_templates(),
                path = %path.display(),
                "template bank loaded"
            );
            bank
        }
        None => {
            tracing::warn!("no template bank given, starting empty (enroll via the console)");
            TemplateBank::default()
        }
    };

    let source = match &cli.wav {
        Some(path) => AudioSourceConfig::WavFile {
            path: path.clone(),
            mode: if cli.fast {
                PlaybackMode::Accelerated(8.0)
            } else {
                PlaybackMode::Realtime
            },
        },
        None => AudioSourceConfig::Microphone {
            device: cli.device.clone(),
        },
    };

    let mut handle = runtime::start(AppRuntimeOptions {
        source,
        resampler_quality: parse_quality(&cli.resampler_quality),
        config,
        bank,
    })
    .await?;
    state_manager.transition(AppState::Running)?;
    tracing::info!("application state: {:?}", state_manager.current());

    let console_handle = spawn_stdin_control(handle.control_tx.clone());

    let mut replay_done = handle.take_replay_done();
    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                tracing::info!("shutdown signal received");
                break;
            }
            _ = stats_interval.tick() => {
                let m = &handle.metrics;
                tracing::info!(
                    hops = m.chunker_frames.load(Ordering::Relaxed),
                    utterances = m.segments_detected.load(Ordering::Relaxed),
                    accepted = m.matches_accepted.load(Ordering::Relaxed),
                    commands = m.commands_emitted.load(Ordering::Relaxed),
                    drops = m.queue_drops.load(Ordering::Relaxed),
                    "pipeline running"
                );
            }
            _ = async { replay_done.as_mut().unwrap().await }, if replay_done.is_some() => {
                // Give the tail of the file time to clear the stages.
                tracing::info!("replay finished, draining pipeline");
                tokio::time::sleep(Duration::from_millis(500)).await;
                break;
            }
        }
    }

    tracing::info!("beginning graceful shutdown");
    state_manager.transition(AppState::Stopping)?;
    console_handle.abort();
    handle.shutdown().await;
    state_manager.transition(AppState::Stopped)?;
    tracing::info!("shutdown complete");

    Ok(())
}
