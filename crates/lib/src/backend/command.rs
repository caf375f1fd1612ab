//! Out-of-process bundler backend.
//!
//! Runs a configured bundler executable once per build. The request is
//! written to the child's stdin as JSON; the child answers with JSON on
//! stdout. This is the seam the CLI (and its tests) use; in-process hosts
//! implement [`BundleBackend`](super::BundleBackend) directly instead.
//!
//! # Wire Format
//!
//! Request (one JSON object):
//!
//! ```json
//! {
//!   "entry": "/proj/src/components/Card.tsx",
//!   "root": "/proj",
//!   "externals": ["react"],
//!   "classifier": { "...": "see ImportClassifier" }
//! }
//! ```
//!
//! Response:
//!
//! ```json
//! { "code": "...", "styles": ["..."], "inputs": ["/proj/src/..."] }
//! ```
//!
//! or, for a failed build:
//!
//! ```json
//! { "errors": [{ "file": "...", "line": 3, "lineText": "...", "message": "..." }] }
//! ```

use std::path::PathBuf;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{BuildDiagnostic, BuildError, BundleBackend, BundleOutput, BundleRequest};

/// A [`BundleBackend`] that shells out to an external bundler process.
#[derive(Debug, Clone)]
pub struct CommandBackend {
  program: PathBuf,
  args: Vec<String>,
}

/// Child process response, covering both the success and the failure shape.
#[derive(Debug, Deserialize)]
struct WireResponse {
  code: Option<String>,
  #[serde(default)]
  styles: Vec<String>,
  #[serde(default)]
  inputs: Vec<PathBuf>,
  #[serde(default)]
  errors: Vec<BuildDiagnostic>,
}

impl CommandBackend {
  /// Create a backend running `program` for every build.
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  /// Extra arguments passed before the request.
  pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.args = args.into_iter().map(Into::into).collect();
    self
  }

  fn backend_error(&self, request: &BundleRequest, message: impl Into<String>) -> BuildError {
    BuildError::Backend {
      entry: request.entry.display().to_string(),
      message: message.into(),
    }
  }
}

impl BundleBackend for CommandBackend {
  async fn bundle(&self, request: BundleRequest) -> Result<BundleOutput, BuildError> {
    let payload =
      serde_json::to_vec(&request).map_err(|e| self.backend_error(&request, e.to_string()))?;

    debug!(program = %self.program.display(), entry = %request.entry.display(), "invoking bundler");

    let mut child = Command::new(&self.program)
      .args(&self.args)
      .current_dir(&request.root)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| self.backend_error(&request, format!("failed to spawn bundler: {e}")))?;

    let mut stdin = child
      .stdin
      .take()
      .ok_or_else(|| self.backend_error(&request, "bundler stdin unavailable"))?;
    stdin
      .write_all(&payload)
      .await
      .map_err(|e| self.backend_error(&request, format!("failed to write request: {e}")))?;
    drop(stdin);

    let output = child
      .wait_with_output()
      .await
      .map_err(|e| self.backend_error(&request, format!("bundler did not finish: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let response: WireResponse = match serde_json::from_str(stdout.trim()) {
      Ok(response) => response,
      Err(_) => {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
          format!("unparseable bundler output (exit {:?})", output.status.code())
        } else {
          stderr.trim().to_string()
        };
        return Err(self.backend_error(&request, detail));
      }
    };

    if !response.errors.is_empty() {
      return Err(BuildError::Bundle {
        entry: request.entry.display().to_string(),
        diagnostics: response.errors,
      });
    }

    let code = response
      .code
      .ok_or_else(|| self.backend_error(&request, "bundler reported neither code nor errors"))?;

    Ok(BundleOutput {
      code,
      styles: response.styles,
      inputs: response.inputs,
    })
  }
}
