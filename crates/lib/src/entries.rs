//! Entry set resolution.
//!
//! Expands the configured include/exclude glob patterns into the canonical
//! set of absolute entry paths. Matched paths are canonicalized before set
//! membership tests so separator or symlink variance cannot create duplicate
//! or missed entries. Resolution is all-or-nothing: an unreadable directory
//! fails the whole pass instead of producing a partial set.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::paths::PathCodec;

/// Errors raised while expanding entry patterns.
#[derive(Debug, Error)]
pub enum EntryResolveError {
  /// A pattern failed to parse.
  #[error("invalid glob pattern `{pattern}`: {message}")]
  Pattern { pattern: String, message: String },

  /// A directory could not be read during expansion.
  #[error("failed to expand `{pattern}` at {path}: {message}")]
  Expand {
    pattern: String,
    path: String,
    message: String,
  },
}

/// Resolve the configured entry set: `expand(includes) − expand(excludes)`.
///
/// Re-resolving with unchanged patterns yields an identical set.
pub fn resolve_entries(
  codec: &PathCodec,
  includes: &[String],
  excludes: &[String],
) -> Result<BTreeSet<PathBuf>, EntryResolveError> {
  let excluded = expand_patterns(codec, excludes)?;
  let mut entries = expand_patterns(codec, includes)?;
  entries.retain(|path| !excluded.contains(path));
  Ok(entries)
}

/// Expand a list of glob patterns into canonical absolute file paths.
fn expand_patterns(codec: &PathCodec, patterns: &[String]) -> Result<BTreeSet<PathBuf>, EntryResolveError> {
  let mut matched = BTreeSet::new();
  for pattern in patterns {
    let anchored = anchor_pattern(codec, pattern);
    let paths = glob::glob(&anchored).map_err(|e| EntryResolveError::Pattern {
      pattern: pattern.clone(),
      message: e.to_string(),
    })?;
    for result in paths {
      let path = result.map_err(|e| EntryResolveError::Expand {
        pattern: pattern.clone(),
        path: e.path().display().to_string(),
        message: e.to_string(),
      })?;
      if path.is_file() {
        matched.insert(codec.resolve_abs(&path));
      }
    }
  }
  Ok(matched)
}

/// Anchor a root-relative pattern at the project root.
fn anchor_pattern(codec: &PathCodec, pattern: &str) -> String {
  if Path::new(pattern).is_absolute() {
    pattern.to_string()
  } else {
    format!("{}/{}", codec.root_str(), pattern)
  }
}

/// Discover component entry files under every directory matching `pattern`.
///
/// Selection heuristic, per directory:
/// 1. Prefer `index.<ext>`, `<dir>.<ext>`, or `<Dir>.<ext>` when present.
/// 2. With no `<ext>` files at all, recurse into each child directory.
/// 3. Otherwise take every immediate `<ext>` file and still recurse into
///    child directories.
pub fn discover_component_entries(
  codec: &PathCodec,
  pattern: &str,
  ext: &str,
) -> Result<BTreeSet<PathBuf>, EntryResolveError> {
  let anchored = anchor_pattern(codec, pattern);
  let roots = glob::glob(&anchored).map_err(|e| EntryResolveError::Pattern {
    pattern: pattern.to_string(),
    message: e.to_string(),
  })?;

  let mut found = BTreeSet::new();
  for result in roots {
    let dir = result.map_err(|e| EntryResolveError::Expand {
      pattern: pattern.to_string(),
      path: e.path().display().to_string(),
      message: e.to_string(),
    })?;
    if dir.is_dir() {
      collect_entries(codec, pattern, &dir, ext, &mut found)?;
    }
  }
  Ok(found)
}

fn collect_entries(
  codec: &PathCodec,
  pattern: &str,
  dir: &Path,
  ext: &str,
  acc: &mut BTreeSet<PathBuf>,
) -> Result<(), EntryResolveError> {
  let base = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
  let capitalized = capitalize(base);
  let preferred = [
    format!("index.{ext}"),
    format!("{base}.{ext}"),
    format!("{capitalized}.{ext}"),
  ];

  let mut files = Vec::new();
  let mut children = Vec::new();
  let read = std::fs::read_dir(dir).map_err(|e| EntryResolveError::Expand {
    pattern: pattern.to_string(),
    path: dir.display().to_string(),
    message: e.to_string(),
  })?;
  for item in read {
    let item = item.map_err(|e| EntryResolveError::Expand {
      pattern: pattern.to_string(),
      path: dir.display().to_string(),
      message: e.to_string(),
    })?;
    let path = item.path();
    if path.is_dir() {
      children.push(path);
    } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
      files.push(path);
    }
  }
  files.sort();
  children.sort();

  let preferred_hits: Vec<&PathBuf> = files
    .iter()
    .filter(|f| {
      f.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| preferred.iter().any(|p| p.as_str() == name))
    })
    .collect();

  if !preferred_hits.is_empty() {
    for file in preferred_hits {
      acc.insert(codec.resolve_abs(file));
    }
    return Ok(());
  }

  if files.is_empty() {
    for child in &children {
      collect_entries(codec, pattern, child, ext, acc)?;
    }
    return Ok(());
  }

  for file in &files {
    acc.insert(codec.resolve_abs(file));
  }
  for child in &children {
    collect_entries(codec, pattern, child, ext, acc)?;
  }
  Ok(())
}

fn capitalize(name: &str) -> String {
  let mut chars = name.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    None => String::new(),
  }
}
