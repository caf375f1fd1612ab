//! Persisted cache metadata.
//!
//! The metadata file (`_metadata.json`) lives in the cache directory and
//! records every successfully built entry, keyed by path relative to the
//! project root. It is purely a cache: deleting it is always safe and only
//! costs a rebuild.
//!
//! # File Format
//!
//! ```json
//! {
//!   "entries": {
//!     "src/components/Keep.tsx": {
//!       "output": ".prebundle/pb-a1b2c3d4e5f6.js",
//!       "deps": ["src/components/Keep.tsx", "src/shared/theme.ts"],
//!       "hash": "a1b2c3d4e5f6",
//!       "virtualId": "virtual:prebundle:src/components/Keep.tsx",
//!       "styleId": "pb-style-a1b2c3d4e5f6"
//!     }
//!   }
//! }
//! ```
//!
//! Relative paths use forward slashes regardless of platform.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level persisted metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFile {
  /// Persisted entry records, keyed by root-relative entry path.
  #[serde(default)]
  pub entries: BTreeMap<String, PersistedEntry>,
}

/// One persisted entry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEntry {
  /// Root-relative path of the cached artifact.
  pub output: String,

  /// Root-relative paths of every input the last successful build declared.
  pub deps: Vec<String>,

  /// Truncated digest of the entry path.
  pub hash: String,

  /// Virtual address the host's module loader requests this artifact by.
  pub virtual_id: String,

  /// Element id of the injected stylesheet.
  pub style_id: String,
}

impl MetadataFile {
  /// Load persisted metadata, treating missing or malformed data as an empty
  /// cache. This is fail-safe: a corrupt file costs a rebuild, never an
  /// error.
  pub async fn load(path: &Path) -> Self {
    let Ok(raw) = tokio::fs::read_to_string(path).await else {
      return Self::default();
    };
    match serde_json::from_str(&raw) {
      Ok(parsed) => parsed,
      Err(err) => {
        tracing::debug!(path = %path.display(), error = %err, "discarding malformed metadata");
        Self::default()
      }
    }
  }

  /// Serialize and write the metadata file, creating parent directories as
  /// needed. Callers are responsible for serializing concurrent writes.
  pub async fn save(&self, path: &Path) -> std::io::Result<()> {
    let payload = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, payload).await
  }
}
