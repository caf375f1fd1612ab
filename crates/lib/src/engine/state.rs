//! Mutable engine state: entry records, the reverse dependency index, and
//! the in-flight build ledger.
//!
//! All three maps are owned by one engine instance and mutated only behind
//! the engine's state lock. The reverse index invariant (every dep of every
//! record is indexed, and nothing else is) is re-established inside a single
//! locked section whenever a record changes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;

use crate::backend::BuildError;

/// The cached build state for one entry. Exists if and only if a successful
/// build has completed since the last invalidation or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
  /// Absolute path of the cached artifact.
  pub output: PathBuf,

  /// Every input file the last successful build declared. Always contains
  /// the entry itself.
  pub deps: BTreeSet<PathBuf>,

  /// Truncated digest of the entry path; artifact and style identifiers are
  /// derived from it.
  pub hash: String,

  /// Address the host's module loader requests this artifact by.
  pub virtual_id: String,

  /// Element id for the injected stylesheet, unique per entry.
  pub style_id: String,
}

/// Channel type the in-flight ledger hands to callers awaiting a build.
pub(crate) type BuildSender = broadcast::Sender<Result<(), BuildError>>;

#[derive(Default)]
pub(crate) struct EngineState {
  /// One record per successfully built entry.
  pub records: HashMap<PathBuf, EntryRecord>,

  /// Dependency file -> entries whose last successful build declared it.
  pub dep_index: HashMap<PathBuf, HashSet<PathBuf>>,

  /// Entry -> pending build operation. Entries are removed before the result
  /// is broadcast, so a caller arriving after settlement starts fresh.
  pub ledger: HashMap<PathBuf, BuildSender>,
}

impl EngineState {
  /// Insert or replace a record, re-establishing the reverse index.
  pub fn insert_record(&mut self, entry: PathBuf, record: EntryRecord) {
    if let Some(previous) = self.records.get(&entry) {
      let removed: Vec<PathBuf> = previous.deps.difference(&record.deps).cloned().collect();
      for dep in removed {
        self.unindex(&dep, &entry);
      }
    }
    for dep in &record.deps {
      self.dep_index.entry(dep.clone()).or_default().insert(entry.clone());
    }
    self.records.insert(entry, record);
  }

  /// Remove a record and purge its contribution to the reverse index.
  pub fn remove_record(&mut self, entry: &Path) -> Option<EntryRecord> {
    let record = self.records.remove(entry)?;
    for dep in &record.deps {
      self.unindex(dep, entry);
    }
    Some(record)
  }

  /// Entries affected by a change to `dep`, in deterministic order.
  pub fn entries_for_dep(&self, dep: &Path) -> Vec<PathBuf> {
    let Some(bucket) = self.dep_index.get(dep) else {
      return Vec::new();
    };
    let mut entries: Vec<PathBuf> = bucket.iter().cloned().collect();
    entries.sort();
    entries
  }

  fn unindex(&mut self, dep: &Path, entry: &Path) {
    if let Some(bucket) = self.dep_index.get_mut(dep) {
      bucket.remove(entry);
      if bucket.is_empty() {
        self.dep_index.remove(dep);
      }
    }
  }
}
