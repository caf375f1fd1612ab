//! Engine configuration.
//!
//! All fields are plain immutable data supplied once by the host when the
//! engine is constructed; reconfiguration means building a new engine.

use std::path::{Path, PathBuf};

use crate::consts::{CACHE_DIR_ENV, DEFAULT_CACHE_DIR};

/// Configuration for one [`Engine`](crate::Engine) instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Project root all patterns and relative paths are anchored to.
  pub root: PathBuf,

  /// Glob patterns (relative to the root) selecting entry files.
  pub includes: Vec<String>,

  /// Glob patterns removing matches from the include set.
  pub excludes: Vec<String>,

  /// Prepend a style-injection runtime to artifacts that produced CSS.
  pub inject_styles: bool,

  /// Cache directory override. `None` falls back to the `PREBUNDLE_CACHE_DIR`
  /// environment variable, then to `<root>/.prebundle`.
  pub cache_dir: Option<PathBuf>,

  /// Package specifiers the backend must leave to the host's runtime
  /// resolution instead of inlining.
  pub external_packages: Vec<String>,

  /// Package specifiers that are always bundled, even when they would match
  /// `external_packages`.
  pub internal_packages: Vec<String>,

  /// Maximum number of concurrent builds during reconciliation.
  pub parallelism: usize,
}

impl EngineConfig {
  /// Create a configuration with defaults for everything but the root.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      includes: Vec::new(),
      excludes: Vec::new(),
      inject_styles: true,
      cache_dir: None,
      external_packages: Vec::new(),
      internal_packages: Vec::new(),
      parallelism: 4,
    }
  }

  /// Set the include patterns.
  pub fn with_includes(mut self, includes: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.includes = includes.into_iter().map(Into::into).collect();
    self
  }

  /// Set the exclude patterns.
  pub fn with_excludes(mut self, excludes: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.excludes = excludes.into_iter().map(Into::into).collect();
    self
  }

  /// Toggle style injection.
  pub fn with_inject_styles(mut self, inject: bool) -> Self {
    self.inject_styles = inject;
    self
  }

  /// Pin the cache directory.
  pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cache_dir = Some(dir.into());
    self
  }

  /// Set the externalized package list.
  pub fn with_external_packages(mut self, pkgs: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.external_packages = pkgs.into_iter().map(Into::into).collect();
    self
  }

  /// Set the always-bundled package allowlist.
  pub fn with_internal_packages(mut self, pkgs: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.internal_packages = pkgs.into_iter().map(Into::into).collect();
    self
  }

  /// Set the reconciliation build parallelism.
  pub fn with_parallelism(mut self, parallelism: usize) -> Self {
    self.parallelism = parallelism.max(1);
    self
  }

  /// Resolve the effective cache directory for a canonicalized root.
  pub fn resolve_cache_dir(&self, root: &Path) -> PathBuf {
    if let Some(dir) = &self.cache_dir {
      if dir.is_absolute() {
        return dir.clone();
      }
      return root.join(dir);
    }
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
      return PathBuf::from(dir);
    }
    root.join(DEFAULT_CACHE_DIR)
  }
}
