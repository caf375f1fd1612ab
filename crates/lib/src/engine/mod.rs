//! The partial-bundle engine.
//!
//! One `Engine` instance owns the cached state for one configuration: the
//! resolved entry set, the per-entry build records, the reverse dependency
//! index, and the in-flight build ledger. Hosts construct an engine at
//! startup, call [`Engine::reconcile`] once, and then drive it through the
//! resolution, load, and file-change hooks.

mod build;
mod hooks;
mod reconcile;
mod state;

pub use hooks::{HotUpdate, ModuleRegistry, ResolveOutcome};
pub use reconcile::ReconcileReport;
pub use state::EntryRecord;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::backend::{BuildError, BundleBackend};
use crate::config::EngineConfig;
use crate::consts::METADATA_FILENAME;
use crate::entries::{EntryResolveError, resolve_entries};
use crate::metadata::{MetadataFile, PersistedEntry};
use crate::paths::{PathCodec, normalize_slashes};

use state::EngineState;

/// Partial-bundle cache and invalidation engine.
///
/// A cheap clonable handle; clones share the same state. All mutable state
/// lives behind one lock that is never held across an await point; builds
/// and file writes run outside it.
pub struct Engine<B: BundleBackend> {
  inner: Arc<EngineInner<B>>,
}

impl<B: BundleBackend> Clone for Engine<B> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

struct EngineInner<B> {
  config: EngineConfig,
  codec: PathCodec,
  entries: BTreeSet<PathBuf>,
  cache_dir: PathBuf,
  metadata_path: PathBuf,
  backend: B,
  state: Mutex<EngineState>,
  save_lock: tokio::sync::Mutex<()>,
  pending_saves: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl<B: BundleBackend> Engine<B> {
  /// Construct an engine: canonicalize the root, expand the configured
  /// entry patterns, and derive the cache layout.
  ///
  /// Pattern expansion failures are fatal to construction; everything else
  /// (missing cache, stale metadata) is handled later by [`Engine::reconcile`].
  pub fn new(config: EngineConfig, backend: B) -> Result<Self, EntryResolveError> {
    let codec = PathCodec::new(&config.root);
    let entries = resolve_entries(&codec, &config.includes, &config.excludes)?;
    if entries.is_empty() {
      warn!("no entries matched the configured include patterns; engine is idle");
    } else {
      debug!(entries = entries.len(), "resolved entry set");
    }

    let cache_dir = config.resolve_cache_dir(codec.root());
    let metadata_path = cache_dir.join(METADATA_FILENAME);

    Ok(Self {
      inner: Arc::new(EngineInner {
        config,
        codec,
        entries,
        cache_dir,
        metadata_path,
        backend,
        state: Mutex::new(EngineState::default()),
        save_lock: tokio::sync::Mutex::new(()),
        pending_saves: Mutex::new(Vec::new()),
      }),
    })
  }

  /// The canonical configured entry set.
  pub fn entries(&self) -> &BTreeSet<PathBuf> {
    &self.inner.entries
  }

  /// Whether a canonical absolute path is a configured entry.
  pub fn is_entry(&self, path: &Path) -> bool {
    self.inner.entries.contains(path)
  }

  /// The path codec anchored at this engine's root.
  pub fn codec(&self) -> &PathCodec {
    &self.inner.codec
  }

  /// The engine's cache directory.
  pub fn cache_dir(&self) -> &Path {
    &self.inner.cache_dir
  }

  /// The configuration this engine was built from.
  pub fn config(&self) -> &EngineConfig {
    &self.inner.config
  }

  /// The current record for an entry, if a successful build exists.
  pub fn record(&self, entry: &Path) -> Option<EntryRecord> {
    self.with_state(|state| state.records.get(entry).cloned())
  }

  /// Ensure an entry has a ready artifact, building lazily if absent.
  ///
  /// Concurrent callers for the same entry share a single build; a caller
  /// arriving after a record exists returns immediately.
  pub async fn ensure_built(&self, entry: &Path) -> Result<(), BuildError> {
    match self.subscribe_build(entry, true) {
      None => Ok(()),
      Some(rx) => Self::await_settled(rx, entry).await,
    }
  }

  /// Force a rebuild of an entry, reusing any build already in flight.
  ///
  /// Unlike [`Engine::ensure_built`] this never short-circuits on an
  /// existing record; invalidation uses it after a dependency changed.
  pub async fn rebuild(&self, entry: &Path) -> Result<(), BuildError> {
    match self.subscribe_build(entry, false) {
      None => Ok(()),
      Some(rx) => Self::await_settled(rx, entry).await,
    }
  }

  /// Join the pending build for `entry`, spawning one if none is pending.
  ///
  /// Returns `None` when `reuse_record` is set and a record already exists.
  /// The record check and the ledger check happen under one lock so a build
  /// finishing in between cannot be double-started.
  fn subscribe_build(
    &self,
    entry: &Path,
    reuse_record: bool,
  ) -> Option<broadcast::Receiver<Result<(), BuildError>>> {
    let mut state = self.inner.state.lock().expect("engine state poisoned");

    if reuse_record && state.records.contains_key(entry) {
      return None;
    }
    if let Some(pending) = state.ledger.get(entry) {
      return Some(pending.subscribe());
    }

    let (tx, rx) = broadcast::channel(1);
    state.ledger.insert(entry.to_path_buf(), tx);
    drop(state);

    let engine = self.clone();
    let entry = entry.to_path_buf();
    tokio::spawn(async move {
      let result = engine.build_entry(&entry).await;
      // Remove the ledger slot before broadcasting, so a caller that wakes
      // up and immediately retries starts a fresh build instead of joining
      // a settled one.
      let sender = {
        let mut state = engine.inner.state.lock().expect("engine state poisoned");
        state.ledger.remove(&entry)
      };
      if let Some(sender) = sender {
        let _ = sender.send(result);
      }
    });

    Some(rx)
  }

  async fn await_settled(
    mut rx: broadcast::Receiver<Result<(), BuildError>>,
    entry: &Path,
  ) -> Result<(), BuildError> {
    match rx.recv().await {
      Ok(result) => result,
      Err(_) => Err(BuildError::Aborted {
        entry: entry.display().to_string(),
      }),
    }
  }

  /// Queue a metadata save after the current one, if any, completes.
  ///
  /// Saves are strictly serialized through `save_lock`; the state snapshot
  /// is taken inside the critical section so the last write always reflects
  /// the newest state. Persistence is best-effort: failures are logged and
  /// swallowed.
  pub(crate) fn queue_metadata_save(&self) {
    let engine = self.clone();
    let handle = tokio::spawn(async move {
      engine.save_metadata().await;
    });
    let mut pending = self.inner.pending_saves.lock().expect("save queue poisoned");
    pending.retain(|h| !h.is_finished());
    pending.push(handle);
  }

  /// Wait for every queued metadata save, then write once more.
  ///
  /// Hosts call this before shutting down so the on-disk cache reflects the
  /// final state.
  pub async fn flush_metadata(&self) {
    let pending: Vec<_> = {
      let mut queue = self.inner.pending_saves.lock().expect("save queue poisoned");
      queue.drain(..).collect()
    };
    for handle in pending {
      let _ = handle.await;
    }
    self.save_metadata().await;
  }

  async fn save_metadata(&self) {
    let _guard = self.inner.save_lock.lock().await;
    let snapshot = self.snapshot_metadata();
    if let Err(err) = snapshot.save(&self.inner.metadata_path).await {
      warn!(path = %self.inner.metadata_path.display(), error = %err, "failed to write metadata");
    }
  }

  /// Serialize the current records into the portable metadata form.
  pub fn snapshot_metadata(&self) -> MetadataFile {
    self.with_state(|state| {
      let mut file = MetadataFile::default();
      for (entry, record) in &state.records {
        let rel_entry = self.codec().to_relative(&normalize_slashes(entry));
        let deps = record
          .deps
          .iter()
          .map(|d| self.codec().to_relative(&normalize_slashes(d)))
          .collect();
        file.entries.insert(
          rel_entry,
          PersistedEntry {
            output: self.codec().to_relative(&normalize_slashes(&record.output)),
            deps,
            hash: record.hash.clone(),
            virtual_id: record.virtual_id.clone(),
            style_id: record.style_id.clone(),
          },
        );
      }
      file
    })
  }

  pub(crate) fn backend(&self) -> &B {
    &self.inner.backend
  }

  pub(crate) fn metadata_path(&self) -> &Path {
    &self.inner.metadata_path
  }

  pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut EngineState) -> T) -> T {
    let mut state = self.inner.state.lock().expect("engine state poisoned");
    f(&mut state)
  }
}
