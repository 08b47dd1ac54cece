//! tarima-stage: una pasada del orquestador de un directorio de origen a uno
//! de staging.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tarima_fs::LocalFileSystem;
use tarima_metadata::{ImageConfig, JsonSidecarSerializer, RasterImageInspector};
use tarima_pipeline::{DirectoryProcessor, PipelineConfig, RuleAlbumValidator, RunContext};

#[derive(Parser, Debug)]
#[command(name = "tarima-stage")]
#[command(about = "Stage raw music directories into normalized album directories")]
#[command(version)]
struct Args {
  /// Directorio con los álbumes de entrada.
  #[arg(env = "TARIMA_SOURCE")]
  source: PathBuf,

  /// Directorio de staging; debe existir.
  #[arg(env = "TARIMA_STAGING")]
  staging: PathBuf,

  /// Máximo de álbumes válidos en esta pasada; sustituye al de tarima.toml.
  #[arg(long)]
  max_albums: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let args = Args::parse();

  let cfg = PipelineConfig::load().context("loading [pipeline] configuration")?;
  let images = ImageConfig::load().context("loading [images] configuration")?;
  let quota = args.max_albums.or(cfg.maximum_processing_count);

  let processor = DirectoryProcessor::new(
    Arc::new(LocalFileSystem::new()),
    Arc::new(JsonSidecarSerializer),
    Arc::new(RuleAlbumValidator::new(&cfg)),
    Arc::new(RasterImageInspector::new(images)),
    cfg,
  );

  let token = CancellationToken::new();
  let on_signal = token.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupt received, finishing current album");
      on_signal.cancel();
    }
  });

  let ctx = RunContext::new(token, quota);
  let result = processor.process_directories(&args.source, &args.staging, &ctx).await;

  for message in &result.messages {
    tracing::warn!("{message}");
  }
  for error in &result.errors {
    tracing::error!("{error}");
  }
  println!("{}", serde_json::to_string_pretty(&result.data).context("serializing summary")?);

  if result.data.aborted || (result.data.directories_processed == 0 && !result.is_success()) {
    anyhow::bail!("run failed with {} error(s)", result.errors.len());
  }
  Ok(())
}
