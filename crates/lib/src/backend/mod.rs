//! Build backend boundary.
//!
//! The engine never transforms code itself. It hands one entry at a time to a
//! [`BundleBackend`] and consumes the reported outputs: script text,
//! stylesheet text, and the set of input files that participated in the
//! build. Everything about *how* the backend bundles is out of scope here;
//! the engine only relies on the contract below.

pub mod classify;
pub mod command;

use std::future::Future;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use classify::ImportClassifier;

/// One structured diagnostic from a failed backend build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDiagnostic {
  /// Source file the diagnostic points at.
  pub file: String,

  /// 1-based line number.
  pub line: u32,

  /// Text of the offending line.
  pub line_text: String,

  /// Human-readable message.
  pub message: String,
}

impl std::fmt::Display for BuildDiagnostic {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}: {} | {}", self.file, self.line, self.message, self.line_text)
  }
}

fn first_diagnostic(diagnostics: &[BuildDiagnostic]) -> String {
  match diagnostics.first() {
    Some(diagnostic) => diagnostic.to_string(),
    None => "unknown error".to_string(),
  }
}

/// Errors that can prevent an entry from becoming servable.
///
/// All payloads are plain strings so one settled result can be handed to
/// every caller waiting on the same in-flight build.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
  /// The backend rejected the entry.
  #[error("bundling {entry} failed: {}", first_diagnostic(.diagnostics))]
  Bundle {
    entry: String,
    diagnostics: Vec<BuildDiagnostic>,
  },

  /// The backend could not run or produced an unusable result.
  #[error("backend error for {entry}: {message}")]
  Backend { entry: String, message: String },

  /// The finished artifact could not be written.
  #[error("failed to write artifact {path}: {message}")]
  WriteArtifact { path: String, message: String },

  /// A cached artifact could not be read back.
  #[error("failed to read artifact {path}: {message}")]
  ReadArtifact { path: String, message: String },

  /// The build task died before reporting a result.
  #[error("build for {entry} was aborted")]
  Aborted { entry: String },
}

impl BuildError {
  /// Diagnostics carried by this error, if any.
  pub fn diagnostics(&self) -> &[BuildDiagnostic] {
    match self {
      BuildError::Bundle { diagnostics, .. } => diagnostics,
      _ => &[],
    }
  }
}

/// A single build request handed to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct BundleRequest {
  /// Absolute path of the entry to bundle.
  pub entry: PathBuf,

  /// Project root the build is anchored to.
  pub root: PathBuf,

  /// Packages the backend must leave as runtime imports.
  pub externals: Vec<String>,

  /// Import-classification snapshot the backend plugs into its own module
  /// resolution. See [`ImportClassifier::classify`].
  pub classifier: ImportClassifier,
}

/// Everything a successful backend build reports.
#[derive(Debug, Clone, Default)]
pub struct BundleOutput {
  /// Bundled script text.
  pub code: String,

  /// Stylesheet outputs, in emission order.
  pub styles: Vec<String>,

  /// Every file that participated in the build. The engine adds the entry
  /// itself if the backend forgot it.
  pub inputs: Vec<PathBuf>,
}

/// The external bundler the orchestrator delegates code transformation to.
pub trait BundleBackend: Send + Sync + 'static {
  /// Bundle one entry. A failed build reports diagnostics through
  /// [`BuildError::Bundle`]; the engine then leaves any previously cached
  /// artifact untouched.
  fn bundle(&self, request: BundleRequest) -> impl Future<Output = Result<BundleOutput, BuildError>> + Send;
}
