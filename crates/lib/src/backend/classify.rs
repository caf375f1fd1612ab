//! Import classification.
//!
//! The backend resolves most imports itself; this module is the narrow
//! resolution step the engine injects so that cross-entry references are
//! redirected instead of inlined and runtime-resolved packages stay out of
//! the bundle.
//!
//! Precedence is fixed and explicit:
//! 1. internal package allowlist (always bundled)
//! 2. externalized package list (left as runtime imports)
//! 3. cross-reference to another configured entry (rewritten to its virtual
//!    address)
//! 4. static-asset extension (externalized, path rewritten relative to the
//!    project root)
//! 5. in-scope path (bundled)
//! 6. everything else outside the root (externalized by normalized path)

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::VIRTUAL_PREFIX;
use crate::paths::{lexical_clean, normalize_slashes, strip_query};

/// File extensions treated as static assets and never inlined.
pub const ASSET_EXTENSIONS: &[&str] = &[
  "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2", "ttf", "eot", "otf", "mp4",
  "webm", "mp3", "wav", "ogg", "aac", "flac", "m4a", "txt", "xml", "json", "yaml", "yml", "toml",
  "ini", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
];

/// What the backend should do with one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
  /// Resolve and inline the file at this absolute path.
  Bundle(PathBuf),

  /// Leave the import in place for the host to resolve at runtime.
  Externalize(String),

  /// Externalize a static asset; the payload is the asset's path relative to
  /// the project root.
  ExternalizeAsset(PathBuf),

  /// No opinion; the backend's own resolution proceeds normally.
  Defer,
}

/// Immutable classification snapshot for one build.
///
/// Serializable so out-of-process backends can apply the same rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportClassifier {
  root: PathBuf,
  entry: PathBuf,
  entries: BTreeSet<PathBuf>,
  externals: BTreeSet<String>,
  internals: BTreeSet<String>,
}

impl ImportClassifier {
  /// Build a classifier for bundling `entry` against the configured set.
  pub fn new(
    root: PathBuf,
    entry: PathBuf,
    entries: BTreeSet<PathBuf>,
    externals: impl IntoIterator<Item = String>,
    internals: impl IntoIterator<Item = String>,
  ) -> Self {
    Self {
      root,
      entry,
      entries,
      externals: externals.into_iter().collect(),
      internals: internals.into_iter().collect(),
    }
  }

  /// Classify one import found while bundling.
  pub fn classify(&self, specifier: &str, importer: &Path) -> Disposition {
    let specifier = strip_query(specifier);

    // Already-rewritten addresses stay external.
    if specifier.starts_with(VIRTUAL_PREFIX) {
      return Disposition::Externalize(specifier.to_string());
    }

    if is_bare_specifier(specifier) {
      let name = package_name(specifier);
      if self.internals.contains(name) {
        return Disposition::Defer;
      }
      if self.externals.contains(name) {
        return Disposition::Externalize(specifier.to_string());
      }
      return Disposition::Defer;
    }

    let resolved = self.resolve_path(specifier, importer);

    if resolved != self.entry && self.entries.contains(&resolved) {
      return Disposition::Externalize(self.virtual_address(&resolved));
    }

    if has_asset_extension(&resolved) {
      return Disposition::ExternalizeAsset(self.root_relative(&resolved));
    }

    if resolved.starts_with(&self.root) {
      return Disposition::Bundle(resolved);
    }

    Disposition::Externalize(normalize_slashes(&resolved))
  }

  /// The virtual address of a configured entry.
  pub fn virtual_address(&self, entry: &Path) -> String {
    let rel = self.root_relative(entry);
    format!("{VIRTUAL_PREFIX}{}", normalize_slashes(&rel))
  }

  fn resolve_path(&self, specifier: &str, importer: &Path) -> PathBuf {
    let spec_path = Path::new(specifier);
    if spec_path.is_absolute() {
      return lexical_clean(spec_path);
    }
    let base = Path::new(strip_query(&importer.to_string_lossy()))
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| self.root.clone());
    lexical_clean(&base.join(spec_path))
  }

  fn root_relative(&self, path: &Path) -> PathBuf {
    path.strip_prefix(&self.root).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
  }
}

/// A specifier naming a package rather than a file path.
fn is_bare_specifier(specifier: &str) -> bool {
  !specifier.starts_with('.') && !specifier.starts_with('/') && !Path::new(specifier).is_absolute()
}

/// The package part of a bare specifier (`@scope/pkg/sub` -> `@scope/pkg`).
fn package_name(specifier: &str) -> &str {
  let mut segments = specifier.splitn(3, '/');
  let first = segments.next().unwrap_or(specifier);
  if first.starts_with('@') {
    match segments.next() {
      Some(second) => &specifier[..first.len() + 1 + second.len()],
      None => first,
    }
  } else {
    first
  }
}

fn has_asset_extension(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|ext| ASSET_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
    .unwrap_or(false)
}
