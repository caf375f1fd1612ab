use std::path::Path;

use anyhow::{Context, Result};

use prebundle_lib::EngineConfig;

use crate::output::{print_info, print_success};

pub fn cmd_clean(root: &Path, cache_dir: Option<&Path>) -> Result<()> {
  let root = dunce::canonicalize(root).with_context(|| format!("project root {} not found", root.display()))?;

  let mut config = EngineConfig::new(root.clone());
  if let Some(dir) = cache_dir {
    config = config.with_cache_dir(dir);
  }
  let cache_dir = config.resolve_cache_dir(&root);

  match std::fs::remove_dir_all(&cache_dir) {
    Ok(()) => {
      print_success(&format!("Removed {}", cache_dir.display()));
      Ok(())
    }
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      print_info("Cache directory does not exist; nothing to do");
      Ok(())
    }
    Err(e) => Err(e).with_context(|| format!("failed to remove {}", cache_dir.display())),
  }
}
