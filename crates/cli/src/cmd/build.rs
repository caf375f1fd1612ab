use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};

use prebundle_lib::backend::command::CommandBackend;
use prebundle_lib::entries::discover_component_entries;
use prebundle_lib::{Engine, EngineConfig, PathCodec};

use crate::output::{OutputFormat, format_duration, print_error, print_json, print_stat, print_success};

pub struct BuildArgs {
  pub root: PathBuf,
  pub includes: Vec<String>,
  pub excludes: Vec<String>,
  pub discover: Option<String>,
  pub discover_ext: String,
  pub backend: PathBuf,
  pub backend_args: Vec<String>,
  pub cache_dir: Option<PathBuf>,
  pub inject_styles: bool,
  pub externals: Vec<String>,
  pub internals: Vec<String>,
  pub parallelism: usize,
  pub format: OutputFormat,
}

pub async fn cmd_build(args: BuildArgs) -> Result<()> {
  let start = Instant::now();

  let root = dunce::canonicalize(&args.root)
    .with_context(|| format!("project root {} not found", args.root.display()))?;

  let mut includes = args.includes;
  if let Some(pattern) = &args.discover {
    let codec = PathCodec::new(&root);
    let found = discover_component_entries(&codec, pattern, &args.discover_ext)
      .context("entry discovery failed")?;
    includes.extend(found.iter().map(|p| p.display().to_string()));
  }

  let mut config = EngineConfig::new(root)
    .with_includes(includes)
    .with_excludes(args.excludes)
    .with_inject_styles(args.inject_styles)
    .with_external_packages(args.externals)
    .with_internal_packages(args.internals)
    .with_parallelism(args.parallelism);
  if let Some(cache_dir) = args.cache_dir {
    config = config.with_cache_dir(cache_dir);
  }

  let backend = CommandBackend::new(args.backend).with_args(args.backend_args);
  let engine = Engine::new(config, backend).context("failed to resolve entry set")?;

  let report = engine.reconcile().await;
  engine.flush_metadata().await;

  if args.format.is_json() {
    print_json(&report)?;
  } else {
    println!();
    if report.failed == 0 {
      print_success("Cache is warm");
    } else {
      print_error(&format!("{} entries failed to build", report.failed));
    }
    print_stat("Entries", &engine.entries().len().to_string());
    print_stat("Reused", &report.reused.to_string());
    print_stat("Built", &report.built.to_string());
    print_stat("Removed", &report.removed.to_string());
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  if report.failed > 0 {
    bail!("{} entries failed to build", report.failed);
  }
  Ok(())
}
