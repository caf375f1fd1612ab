//! Host-facing hooks: import resolution, artifact loading, and file-change
//! invalidation.
//!
//! These are the three points where the surrounding dev server drives the
//! engine. Outcomes are tagged variants rather than sentinel values so a
//! declined resolution can never be confused with an empty result.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backend::{BuildError, BundleBackend};
use crate::consts::VIRTUAL_PREFIX;
use crate::paths::strip_query;

use super::Engine;

/// Result of asking the engine to resolve an import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
  /// The specifier names a configured entry; load it via this address.
  Accepted(String),

  /// Not an entry; the host's own resolution continues.
  Declined,
}

/// Result of a file-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotUpdate {
  /// These live modules were rebuilt and invalidated; propagate them.
  Invalidated(Vec<String>),

  /// No live module was affected. Distinct from "handled, nothing to do":
  /// the host should fall back to its default handling.
  Unhandled,
}

/// Handle to the host's live module registry.
///
/// `invalidate` returns whether a live module existed for the address; when
/// it did, the host must have marked it invalidated.
pub trait ModuleRegistry {
  fn invalidate(&mut self, virtual_id: &str) -> bool;
}

impl<B: BundleBackend> Engine<B> {
  /// Resolve an import specifier to a virtual address if it names a
  /// configured entry: directly, relative to the importer, or through the
  /// host's own resolver.
  ///
  /// On acceptance the entry is built (lazily) before the address is
  /// returned, so a following load can serve it immediately.
  pub async fn resolve_import<F>(
    &self,
    specifier: &str,
    importer: Option<&Path>,
    host_resolve: F,
  ) -> Result<ResolveOutcome, BuildError>
  where
    F: FnOnce(&str, Option<&Path>) -> Option<PathBuf>,
  {
    let specifier = strip_query(specifier);

    let entry = self
      .match_direct(specifier, importer)
      .or_else(|| self.match_via_host(specifier, importer, host_resolve));

    let Some(entry) = entry else {
      return Ok(ResolveOutcome::Declined);
    };

    self.ensure_built(&entry).await?;
    Ok(ResolveOutcome::Accepted(self.virtual_id(&entry)))
  }

  /// Serve the artifact text for a previously resolved virtual address.
  ///
  /// Unknown or unconfigured addresses are declined with `Ok(None)`; the
  /// entry is built lazily if its artifact is absent.
  pub async fn load_artifact(&self, virtual_id: &str) -> Result<Option<String>, BuildError> {
    let Some(rel) = virtual_id.strip_prefix(VIRTUAL_PREFIX) else {
      return Ok(None);
    };
    let entry = self.codec().resolve_abs(Path::new(rel));
    if !self.is_entry(&entry) {
      return Ok(None);
    }

    self.ensure_built(&entry).await?;

    let Some(record) = self.record(&entry) else {
      return Ok(None);
    };
    let text = tokio::fs::read_to_string(&record.output)
      .await
      .map_err(|e| BuildError::ReadArtifact {
        path: record.output.display().to_string(),
        message: e.to_string(),
      })?;
    Ok(Some(text))
  }

  /// React to a changed file: rebuild exactly the entries whose last
  /// successful build depended on it, and invalidate their live modules.
  ///
  /// An entry's own file is a member of its dependency set, so edits to the
  /// entry itself need no special case. A build failure is surfaced to the
  /// caller; the previously cached artifact stays untouched.
  pub async fn handle_file_change(
    &self,
    path: &Path,
    registry: &mut dyn ModuleRegistry,
  ) -> Result<HotUpdate, BuildError> {
    let file = self.codec().resolve_abs(path);
    let affected = self.with_state(|state| state.entries_for_dep(&file));
    if affected.is_empty() {
      return Ok(HotUpdate::Unhandled);
    }

    debug!(file = %file.display(), affected = affected.len(), "dependency changed");

    let mut invalidated = Vec::new();
    for entry in affected {
      self.rebuild(&entry).await?;
      let virtual_id = self.virtual_id(&entry);
      if registry.invalidate(&virtual_id) {
        invalidated.push(virtual_id);
      }
    }

    if invalidated.is_empty() {
      Ok(HotUpdate::Unhandled)
    } else {
      Ok(HotUpdate::Invalidated(invalidated))
    }
  }

  fn match_direct(&self, specifier: &str, importer: Option<&Path>) -> Option<PathBuf> {
    let spec_path = Path::new(specifier);
    if spec_path.is_absolute() {
      return self.check_candidate(spec_path);
    }
    if specifier.starts_with('.') {
      let importer = importer?;
      let importer = Path::new(strip_query(&importer.to_string_lossy()).trim_end_matches('/')).to_path_buf();
      let base = importer.parent()?;
      return self.check_candidate(&base.join(spec_path));
    }
    None
  }

  fn match_via_host<F>(&self, specifier: &str, importer: Option<&Path>, host_resolve: F) -> Option<PathBuf>
  where
    F: FnOnce(&str, Option<&Path>) -> Option<PathBuf>,
  {
    let resolved = host_resolve(specifier, importer)?;
    let resolved = strip_query(&resolved.to_string_lossy()).to_string();
    self.check_candidate(Path::new(&resolved))
  }

  fn check_candidate(&self, candidate: &Path) -> Option<PathBuf> {
    let normalized = self.codec().resolve_abs(candidate);
    self.is_entry(&normalized).then_some(normalized)
  }
}
