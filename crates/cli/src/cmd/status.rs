use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use prebundle_lib::consts::METADATA_FILENAME;
use prebundle_lib::{EngineConfig, MetadataFile, PathCodec};

use crate::output::{OutputFormat, print_info, print_json, print_stat, symbols};

pub async fn cmd_status(root: &Path, cache_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
  let root = dunce::canonicalize(root).with_context(|| format!("project root {} not found", root.display()))?;

  let mut config = EngineConfig::new(root.clone());
  if let Some(dir) = cache_dir {
    config = config.with_cache_dir(dir);
  }
  let cache_dir = config.resolve_cache_dir(&root);
  let metadata = MetadataFile::load(&cache_dir.join(METADATA_FILENAME)).await;

  if format.is_json() {
    return print_json(&metadata);
  }

  if metadata.entries.is_empty() {
    print_info("Cache is empty");
    return Ok(());
  }

  let codec = PathCodec::new(&root);
  let mut present = 0usize;
  for (entry, record) in &metadata.entries {
    let artifact = codec.abs_path(&record.output);
    let (symbol, note) = if artifact.exists() {
      present += 1;
      (symbols::SUCCESS, String::new())
    } else {
      (symbols::ERROR, " (artifact missing)".to_string())
    };
    println!(
      "{} {} {}{}",
      symbol.if_supports_color(Stream::Stdout, |s| s.green()),
      entry,
      format!("[{} deps]", record.deps.len()).if_supports_color(Stream::Stdout, |s| s.dimmed()),
      note
    );
  }

  println!();
  print_stat("Cache dir", &cache_dir.display().to_string());
  print_stat("Entries", &metadata.entries.len().to_string());
  print_stat("Artifacts present", &present.to_string());
  Ok(())
}
