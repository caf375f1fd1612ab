//! Build orchestration for a single entry.
//!
//! Turns one entry into a ready-to-serve artifact: derive the deterministic
//! identifiers, invoke the backend, assemble the script and style payloads,
//! persist the artifact, and commit the record plus reverse-index update.
//! Nothing is written and nothing is mutated unless the backend reports a
//! fully successful build, so a broken edit can never erase the last-known-
//! good artifact.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::backend::classify::ImportClassifier;
use crate::backend::{BuildError, BundleBackend, BundleRequest};
use crate::consts::{ARTIFACT_PREFIX, ENTRY_HASH_LEN, STYLE_ID_PREFIX, VIRTUAL_PREFIX};
use crate::paths::normalize_slashes;
use crate::style::{collect_styles, style_injector};

use super::state::EntryRecord;
use super::Engine;

/// Deterministic identifiers derived from an entry's canonical path.
///
/// Pure derivation, no I/O: artifact filenames stay stable across process
/// restarts unless the entry path itself changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntryIdentity {
  pub hash: String,
  pub output: PathBuf,
  pub virtual_id: String,
  pub style_id: String,
}

impl<B: BundleBackend> Engine<B> {
  pub(crate) fn derive_identity(&self, entry: &Path) -> EntryIdentity {
    let rel = self.codec().to_relative(&normalize_slashes(entry));
    let digest = Sha256::digest(rel.as_bytes());
    let hash = hex::encode(digest)[..ENTRY_HASH_LEN].to_string();
    EntryIdentity {
      output: self.cache_dir().join(format!("{ARTIFACT_PREFIX}{hash}.js")),
      virtual_id: format!("{VIRTUAL_PREFIX}{rel}"),
      style_id: format!("{STYLE_ID_PREFIX}{hash}"),
      hash,
    }
  }

  /// The virtual address an entry is served under.
  pub fn virtual_id(&self, entry: &Path) -> String {
    self.derive_identity(entry).virtual_id
  }

  /// Run one backend build and commit its result.
  pub(crate) async fn build_entry(&self, entry: &Path) -> Result<(), BuildError> {
    let identity = self.derive_identity(entry);
    debug!(entry = %entry.display(), hash = %identity.hash, "building entry");

    let classifier = ImportClassifier::new(
      self.codec().root().to_path_buf(),
      entry.to_path_buf(),
      self.entries().clone(),
      self.config().external_packages.iter().cloned(),
      self.config().internal_packages.iter().cloned(),
    );
    let request = BundleRequest {
      entry: entry.to_path_buf(),
      root: self.codec().root().to_path_buf(),
      externals: self.config().external_packages.clone(),
      classifier,
    };

    let output = self.backend().bundle(request).await?;

    let mut contents = output.code;
    if self.config().inject_styles {
      let css = collect_styles(&output.styles);
      if !css.is_empty() {
        contents = format!("{}\n{}", style_injector(&identity.style_id, &css), contents);
      }
    }

    let write_err = |e: std::io::Error| BuildError::WriteArtifact {
      path: identity.output.display().to_string(),
      message: e.to_string(),
    };
    if let Some(parent) = identity.output.parent() {
      tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(&identity.output, &contents).await.map_err(write_err)?;

    let mut deps: BTreeSet<PathBuf> =
      output.inputs.iter().map(|input| self.codec().resolve_abs(input)).collect();
    deps.insert(entry.to_path_buf());

    let record = EntryRecord {
      output: identity.output.clone(),
      deps,
      hash: identity.hash.clone(),
      virtual_id: identity.virtual_id.clone(),
      style_id: identity.style_id.clone(),
    };
    self.with_state(|state| state.insert_record(entry.to_path_buf(), record));
    self.queue_metadata_save();

    info!(entry = %entry.display(), output = %identity.output.display(), "entry built");
    Ok(())
  }
}
