//! prebundle - partial-bundle cache tool
//!
//! Warms, inspects, and clears the on-disk artifact cache the engine
//! maintains for a dev server. The actual bundling is delegated to an
//! external bundler process speaking the JSON contract documented in
//! `prebundle-lib`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use output::OutputFormat;

/// Partial-bundle cache: build entries ahead of time and keep them warm.
#[derive(Parser)]
#[command(name = "prebundle")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve the entry set, reconcile the cache, and build what is missing
  Build {
    /// Project root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Entry include pattern, relative to the root (repeatable)
    #[arg(short, long = "include", required_unless_present = "discover")]
    includes: Vec<String>,

    /// Entry exclude pattern (repeatable)
    #[arg(short, long = "exclude")]
    excludes: Vec<String>,

    /// Discover component entries under directories matching this glob
    /// (index.<ext> / <dir>.<ext> preferred, recursing otherwise)
    #[arg(long)]
    discover: Option<String>,

    /// File extension used by --discover
    #[arg(long, default_value = "tsx")]
    discover_ext: String,

    /// Bundler executable invoked once per entry
    #[arg(short, long)]
    backend: PathBuf,

    /// Extra argument passed to the bundler (repeatable)
    #[arg(long = "backend-arg")]
    backend_args: Vec<String>,

    /// Cache directory (default: <root>/.prebundle)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Skip the style-injection runtime even when builds emit CSS
    #[arg(long)]
    no_inject_styles: bool,

    /// Package left to the host's runtime resolution (repeatable)
    #[arg(long = "external")]
    externals: Vec<String>,

    /// Package bundled even when listed as external (repeatable)
    #[arg(long = "internal")]
    internals: Vec<String>,

    /// Maximum number of concurrent builds
    #[arg(long, default_value_t = 4)]
    parallelism: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Show what the cache currently holds
  Status {
    /// Project root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Cache directory (default: <root>/.prebundle)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Delete the cache directory
  Clean {
    /// Project root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Cache directory (default: <root>/.prebundle)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "prebundle=debug,prebundle_lib=debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .init();

  match cli.command {
    Commands::Build {
      root,
      includes,
      excludes,
      discover,
      discover_ext,
      backend,
      backend_args,
      cache_dir,
      no_inject_styles,
      externals,
      internals,
      parallelism,
      format,
    } => {
      cmd::cmd_build(cmd::BuildArgs {
        root,
        includes,
        excludes,
        discover,
        discover_ext,
        backend,
        backend_args,
        cache_dir,
        inject_styles: !no_inject_styles,
        externals,
        internals,
        parallelism,
        format,
      })
      .await
    }
    Commands::Status { root, cache_dir, format } => cmd::cmd_status(&root, cache_dir.as_deref(), format).await,
    Commands::Clean { root, cache_dir } => cmd::cmd_clean(&root, cache_dir.as_deref()),
  }
}
