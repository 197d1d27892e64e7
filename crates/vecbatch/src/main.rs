use tokio_util::sync::CancellationToken;
use tracing::error;
use vecbatch::cli::{Cli, Commands};
use vecbatch::handlers::{
  handle_chunk_command, handle_config_command, handle_config_defaults_command, handle_init_command,
  handle_run_command,
};
use vecbatch::{init_logging, load_config};

#[tokio::main]
async fn main() {
  let cli = Cli::parse();

  if let Err(e) = init_logging(env!("CARGO_PKG_NAME"), cli.json) {
    eprintln!("Failed to initialize logging: {}", e);
  }
  setup_panic_hook();

  let result = match cli.command {
    Commands::Init { force } => handle_init_command(force).await,
    Commands::Chunk {
      path,
      strategy,
      size,
      overlap,
    } => handle_chunk_command(path, strategy, size, overlap).await,
    Commands::Config { defaults: true } => handle_config_defaults_command().await,
    Commands::Config { defaults: false } => match load_config(cli.config.as_deref()) {
      Ok(config) => handle_config_command(&config).await,
      Err(e) => {
        error!("Failed to load config: {:#}", e);
        Err(1)
      }
    },
    Commands::Run => match load_config(cli.config.as_deref()) {
      Ok(config) => handle_run_command(config, CancellationToken::new()).await,
      Err(e) => {
        error!("Failed to load config: {:#}", e);
        Err(1)
      }
    },
  };

  if let Err(code) = result {
    std::process::exit(code);
  }
}

fn setup_panic_hook() {
  std::panic::set_hook(Box::new(|panic| {
    if let Some(location) = panic.location() {
      error!(
        message = %panic,
        panic.file = location.file(),
        panic.line = location.line(),
        panic.column = location.column(),
      );
    } else {
      error!(message = %panic);
    }
  }));
}
