use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vecbatch_chunkers::ChunkStrategy;

#[derive(Parser)]
#[command(name = "vecbatch")]
#[command(about = "Chunk text batches and turn them into embeddings", long_about = None)]
#[command(version)]
pub struct Cli {
  /// Path to configuration file
  #[arg(short, long, global = true, env = "VECBATCH_CONFIG")]
  pub config: Option<PathBuf>,

  /// Emit logs as JSON lines
  #[arg(long, global = true)]
  pub json: bool,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
  /// Consume dispatch messages until interrupted
  Run,

  /// Initialize configuration file
  Init {
    /// Force overwrite existing config file
    #[arg(short, long)]
    force: bool,
  },

  /// Show current configuration
  Config {
    /// Show default configuration
    #[arg(long)]
    defaults: bool,
  },

  /// Chunk a local file and print the chunks
  Chunk {
    /// File to chunk
    path: PathBuf,

    /// exact, paragraph or sentence
    #[arg(short, long, default_value = "exact")]
    strategy: ChunkStrategy,

    /// Maximum chunk length in characters
    #[arg(long, default_value = "512")]
    size: usize,

    /// Characters shared between neighbouring chunks
    #[arg(long, default_value = "0")]
    overlap: usize,
  },
}

impl Cli {
  pub fn parse() -> Self {
    <Self as Parser>::parse()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_chunk_command() {
    let cli = Cli::try_parse_from([
      "vecbatch",
      "chunk",
      "notes.txt",
      "--strategy",
      "paragraph",
      "--size",
      "64",
      "--overlap",
      "8",
    ])
    .unwrap();

    match cli.command {
      Commands::Chunk {
        path,
        strategy,
        size,
        overlap,
      } => {
        assert_eq!(path, PathBuf::from("notes.txt"));
        assert_eq!(strategy, ChunkStrategy::Paragraph);
        assert_eq!((size, overlap), (64, 8));
      }
      _ => panic!("expected chunk command"),
    }
  }

  #[test]
  fn test_global_flags() {
    let cli = Cli::try_parse_from(["vecbatch", "run", "--json", "-c", "worker.toml"]).unwrap();
    assert!(cli.json);
    assert_eq!(cli.config, Some(PathBuf::from("worker.toml")));
    assert!(matches!(cli.command, Commands::Run));
  }
}
