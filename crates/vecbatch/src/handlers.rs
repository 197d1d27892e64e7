use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vecbatch_chunkers::{ChunkOptions, ChunkStrategy, chunk};
use vecbatch_worker::{Worker, WorkerConfig};

use crate::config::{default_config_path, generate_commented_config};

pub async fn handle_run_command(config: WorkerConfig, shutdown_token: CancellationToken) -> Result<(), i32> {
  info!(
    "Starting vecbatch worker: broker {} (tls: {}), consuming '{}', uploading to '{}'",
    config.broker.address(),
    config.broker.use_tls(),
    config.broker.consume_queue,
    config.broker.upload_queue
  );
  info!(
    "Sync provider: {} model {} ({} chunks per call, {} calls in flight)",
    config.sync_provider.api_base,
    config.sync_provider.model,
    config.sync_provider.max_items_per_call,
    config.sync_provider.pool_size
  );

  let worker = match Worker::from_config(config) {
    Ok(worker) => worker,
    Err(e) => {
      error!("Failed to build worker: {}", e);
      return Err(1);
    }
  };

  let signal_token = shutdown_token.clone();
  tokio::spawn(async move {
    match tokio::signal::ctrl_c().await {
      Ok(()) => info!("Received shutdown signal"),
      Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
    signal_token.cancel();
  });

  match worker.run(shutdown_token).await {
    Ok(()) => Ok(()),
    Err(e) => {
      error!("Worker stopped with error: {}", e);
      Err(1)
    }
  }
}

pub async fn handle_init_command(force: bool) -> Result<(), i32> {
  let config_path = match default_config_path() {
    Ok(path) => path,
    Err(e) => {
      error!("Failed to determine config path: {}", e);
      return Err(1);
    }
  };

  if config_path.exists() && !force {
    error!(
      "Configuration file already exists at: {}\nUse --force to overwrite",
      config_path.display()
    );
    return Err(1);
  }

  if let Some(parent) = config_path.parent() {
    if let Err(e) = tokio::fs::create_dir_all(parent).await {
      error!("Failed to create config directory: {}", e);
      return Err(1);
    }
  }

  if let Err(e) = tokio::fs::write(&config_path, generate_commented_config()).await {
    error!("Failed to write config file: {}", e);
    return Err(1);
  }

  println!("Configuration file created at: {}", config_path.display());
  println!("\nEdit it to point at your broker and repository, then run 'vecbatch run'.");
  println!("Any value can also be set through VECBATCH__<SECTION>__<KEY> environment variables.");
  Ok(())
}

/// Print the commented default file
pub async fn handle_config_defaults_command() -> Result<(), i32> {
  print!("{}", generate_commented_config());
  Ok(())
}

/// Print the configuration as loaded from file and environment
pub async fn handle_config_command(config: &WorkerConfig) -> Result<(), i32> {
  match toml::to_string_pretty(config) {
    Ok(s) => {
      println!("{}", s);
      Ok(())
    }
    Err(e) => {
      error!("Failed to render configuration: {}", e);
      Err(1)
    }
  }
}

pub async fn handle_chunk_command(
  path: PathBuf,
  strategy: ChunkStrategy,
  size: usize,
  overlap: usize,
) -> Result<(), i32> {
  let options = match ChunkOptions::new(size, overlap) {
    Ok(options) => options,
    Err(e) => {
      error!("Invalid chunk options: {}", e);
      return Err(1);
    }
  };

  let text = match tokio::fs::read_to_string(&path).await {
    Ok(text) => text,
    Err(e) => {
      error!("Failed to read {}: {}", path.display(), e);
      return Err(1);
    }
  };

  let chunks = chunk(&text, strategy, options);
  for c in &chunks {
    println!("--- chunk {} ({} chars) ---", c.position, c.text.chars().count());
    println!("{}", c.text);
  }
  info!(
    "Split {} into {} chunks using {} strategy",
    path.display(),
    chunks.len(),
    strategy
  );
  Ok(())
}
