//! Storyboard extraction binary.

use std::path::PathBuf;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storylens_engine::{EngineConfig, GeminiClient, StoryboardSession};
use storylens_models::AnalysisStatus;

/// Scene-by-scene storyboard extraction for short clips.
#[derive(Debug, Parser)]
#[command(name = "storylens", version, about)]
struct Args {
    /// Video clip to analyze (max 150 MiB, ~70 s recommended)
    clip: PathBuf,

    /// Output directory for storyboard.json and thumbnails
    #[arg(short, long, default_value = "storyboard-out")]
    output: PathBuf,

    /// Analysis model override
    #[arg(long)]
    model: Option<String>,

    /// Jump the display player to a scene timestamp after the run
    #[arg(long)]
    jump_to: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();

    let mut config = EngineConfig::from_env();
    if let Some(model) = args.model {
        config.model = model;
    }

    storylens_media::check_ffmpeg()?;
    storylens_media::check_ffprobe()?;

    let analyzer = GeminiClient::from_env(&config)?;
    let mut session = StoryboardSession::new(analyzer, config);

    // Stream state transitions and capture progress to the log.
    let mut updates = session.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow().clone();
            match snapshot.status {
                AnalysisStatus::Analyzing => info!("scanning clip with the analysis model"),
                AnalysisStatus::Capturing => {
                    if let Some(result) = &snapshot.result {
                        let done = result
                            .scenes
                            .iter()
                            .filter(|s| s.thumbnail.is_some())
                            .count();
                        info!("capturing thumbnails ({}/{})", done, result.scenes.len());
                    }
                }
                AnalysisStatus::Success => info!("storyboard ready"),
                AnalysisStatus::Error | AnalysisStatus::Idle => {}
            }
        }
    });

    session.select_clip(&args.clip).await?;

    if let Err(e) = session.run_analysis().await {
        error!("analysis failed: {}", e.user_message());
        std::process::exit(1);
    }

    let snapshot = session.snapshot();

    if let Some(timestamp) = &args.jump_to {
        let offset = session.jump_to(timestamp).await?;
        info!("display player repositioned to {:.1}s", offset);
    }

    drop(session);
    progress.await.ok();

    let storyboard = snapshot.result.context("run succeeded without a result")?;

    tokio::fs::create_dir_all(&args.output).await?;

    let json = serde_json::to_string_pretty(&storyboard)?;
    let board_path = args.output.join("storyboard.json");
    tokio::fs::write(&board_path, json).await?;

    for (index, scene) in storyboard.scenes.iter().enumerate() {
        let marker = if storyboard.is_outro(index) {
            " [outro]"
        } else if storyboard.is_intro(index) {
            " [intro]"
        } else {
            ""
        };
        info!(
            "scene {:02} @ {} — {} / {}{}",
            index + 1,
            scene.timestamp,
            scene.shot_type,
            scene.camera_movement,
            marker
        );

        if let Some(url) = &scene.thumbnail {
            let Some(encoded) = url.strip_prefix("data:image/jpeg;base64,") else {
                continue;
            };
            let jpeg = BASE64.decode(encoded)?;
            let path = args.output.join(format!("scene_{:02}.jpg", index + 1));
            tokio::fs::write(path, jpeg).await?;
        }
    }

    info!(
        "\"{}\" — {} scenes written to {}",
        storyboard.title,
        storyboard.scene_count(),
        args.output.display()
    );

    Ok(())
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("storylens=info".parse().unwrap())
        .add_directive("storylens_engine=info".parse().unwrap())
        .add_directive("storylens_media=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
