//! Path codec between canonical absolute paths and the portable relative
//! form used in persisted metadata.
//!
//! Persisted metadata must survive a project being checked out at a different
//! location (or inside a container), so every stored path is relative to the
//! project root and uses forward slashes regardless of platform. Paths that
//! lie outside the root (linked packages, virtual-address namespaces, Windows
//! drive prefixes) are kept with their `prefix:` marker so they still
//! round-trip losslessly.

use std::path::{Component, Path, PathBuf};

/// Converts between canonical absolute paths and root-relative strings.
///
/// The codec is pure: it never touches the filesystem except in
/// [`PathCodec::resolve_abs`], which canonicalizes through the real tree when
/// the target exists.
#[derive(Debug, Clone)]
pub struct PathCodec {
  root: PathBuf,
  root_str: String,
}

impl PathCodec {
  /// Create a codec anchored at the given project root.
  ///
  /// The root is canonicalized so that symlinked checkouts and trailing-slash
  /// variance cannot produce two spellings of the same entry.
  pub fn new(root: &Path) -> Self {
    let root = dunce::canonicalize(root).unwrap_or_else(|_| lexical_clean(root));
    let root_str = normalize_slashes(&root);
    Self { root, root_str }
  }

  /// The canonical project root.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// The project root as a normalized forward-slash string.
  pub fn root_str(&self) -> &str {
    &self.root_str
  }

  /// Resolve a possibly-relative path to its canonical absolute form.
  ///
  /// Existing paths are canonicalized through the filesystem; paths that do
  /// not exist yet (artifacts about to be written) are cleaned lexically.
  pub fn resolve_abs(&self, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    };
    dunce::canonicalize(&joined).unwrap_or_else(|_| lexical_clean(&joined))
  }

  /// Encode an absolute path as a portable root-relative string.
  ///
  /// Paths under the root lose the root prefix; the root itself becomes `.`.
  /// Strings that merely *contain* the root after some marker prefix keep the
  /// marker and relativize the tail. Anything else is returned unchanged
  /// (still normalized), which keeps outside-root paths reversible.
  pub fn to_relative(&self, path: &str) -> String {
    if path.is_empty() {
      return String::new();
    }
    let normalized = normalize_slashes(Path::new(path));
    if normalized == self.root_str {
      return ".".to_string();
    }
    if let Some(rest) = normalized.strip_prefix(&self.root_str) {
      if let Some(rel) = rest.strip_prefix('/') {
        return rel.to_string();
      }
    }
    if let Some(idx) = normalized.find(&self.root_str) {
      if idx > 0 {
        let (prefix, suffix) = normalized.split_at(idx);
        let rel = self.to_relative(suffix);
        return format!("{prefix}{rel}");
      }
    }
    normalized
  }

  /// Decode a string produced by [`PathCodec::to_relative`] back to its
  /// absolute form.
  pub fn to_absolute(&self, path: &str) -> String {
    if path.is_empty() {
      return String::new();
    }
    if path == "." {
      return self.root_str.clone();
    }
    if Path::new(path).is_absolute() {
      return normalize_slashes(Path::new(path));
    }
    // A `prefix:` marker (drive letter, namespace) wraps a nested path.
    if let Some(colon) = path.rfind(':') {
      if colon > 0 && colon < path.len() - 1 {
        let (prefix, tail) = path.split_at(colon + 1);
        let rebuilt = if tail.starts_with('/') {
          tail.to_string()
        } else {
          format!("{}/{}", self.root_str, tail)
        };
        return format!("{prefix}{rebuilt}");
      }
    }
    format!("{}/{}", self.root_str, path)
  }

  /// Decode a relative string to an absolute `PathBuf`.
  pub fn abs_path(&self, path: &str) -> PathBuf {
    PathBuf::from(self.to_absolute(path))
  }
}

/// Render a path with forward slashes, dropping any trailing slash.
pub fn normalize_slashes(path: &Path) -> String {
  let mut s = path.to_string_lossy().replace('\\', "/");
  while s.len() > 1 && s.ends_with('/') {
    s.pop();
  }
  s
}

/// Clean `.` and `..` components without touching the filesystem.
pub fn lexical_clean(path: &Path) -> PathBuf {
  let mut cleaned = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !cleaned.pop() {
          cleaned.push(Component::ParentDir);
        }
      }
      other => cleaned.push(other),
    }
  }
  cleaned
}

/// Drop a `?query` suffix from an import specifier or module id.
pub fn strip_query(id: &str) -> &str {
  id.split('?').next().unwrap_or(id)
}
