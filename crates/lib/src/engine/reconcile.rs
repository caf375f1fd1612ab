//! Startup reconciliation between persisted cache state and the configured
//! entry set.
//!
//! After every reconfiguration the cache converges to exactly the configured
//! set: persisted entries that are no longer configured lose their artifact
//! and record, configured entries without a record are built. How many times
//! the configuration changed across restarts does not matter.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::backend::BundleBackend;
use crate::metadata::MetadataFile;

use super::state::EntryRecord;
use super::Engine;

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
  /// Persisted records reinstated unchanged.
  pub reused: usize,

  /// Stale persisted entries whose artifact and record were dropped.
  pub removed: usize,

  /// Entries built during this pass.
  pub built: usize,

  /// Entries whose initial build failed (logged, retried on next request).
  pub failed: usize,
}

impl<B: BundleBackend> Engine<B> {
  /// Load persisted metadata, prune entries that left the configured set,
  /// and build the ones that are missing.
  ///
  /// Build failures do not abort the pass: the failed entry stays
  /// recordless and is retried on its next request.
  pub async fn reconcile(&self) -> ReconcileReport {
    let persisted = MetadataFile::load(self.metadata_path()).await;
    let mut report = ReconcileReport::default();

    for (rel_entry, persisted_entry) in persisted.entries {
      let entry = self.codec().resolve_abs(&self.codec().abs_path(&rel_entry));
      let output = self.codec().abs_path(&persisted_entry.output);

      if !self.is_entry(&entry) {
        debug!(entry = %rel_entry, "pruning stale cache entry");
        // The artifact may already be gone; that is fine.
        let _ = tokio::fs::remove_file(&output).await;
        report.removed += 1;
        continue;
      }

      let mut deps: BTreeSet<PathBuf> = persisted_entry
        .deps
        .iter()
        .map(|dep| PathBuf::from(self.codec().to_absolute(dep)))
        .collect();
      deps.insert(entry.clone());

      let record = EntryRecord {
        output,
        deps,
        hash: persisted_entry.hash,
        virtual_id: persisted_entry.virtual_id,
        style_id: persisted_entry.style_id,
      };
      self.with_state(|state| state.insert_record(entry, record));
      report.reused += 1;
    }

    if report.removed > 0 {
      self.queue_metadata_save();
    }

    let missing: Vec<PathBuf> = {
      let recorded: BTreeSet<PathBuf> = self.with_state(|state| state.records.keys().cloned().collect());
      self.entries().iter().filter(|e| !recorded.contains(*e)).cloned().collect()
    };

    let semaphore = Arc::new(Semaphore::new(self.config().parallelism));
    let mut join_set: JoinSet<(PathBuf, Result<(), crate::backend::BuildError>)> = JoinSet::new();
    for entry in missing {
      let engine = self.clone();
      let semaphore = Arc::clone(&semaphore);
      join_set.spawn(async move {
        let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
        let result = engine.ensure_built(&entry).await;
        (entry, result)
      });
    }

    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok((_, Ok(()))) => report.built += 1,
        Ok((entry, Err(err))) => {
          error!(entry = %entry.display(), error = %err, "initial build failed");
          report.failed += 1;
        }
        Err(err) => {
          error!(error = %err, "build task failed to complete");
          report.failed += 1;
        }
      }
    }

    info!(
      reused = report.reused,
      removed = report.removed,
      built = report.built,
      failed = report.failed,
      "reconciliation complete"
    );
    report
  }

  /// Remove one entry's cached state: artifact file, record, and reverse
  /// index contribution. Used when an entry leaves the configured set at
  /// runtime.
  pub async fn remove_entry(&self, entry: &Path) {
    let record = self.with_state(|state| state.remove_record(entry));
    if let Some(record) = record {
      let _ = tokio::fs::remove_file(&record.output).await;
      self.queue_metadata_save();
    }
  }
}
