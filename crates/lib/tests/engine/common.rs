//! Shared helpers: a temporary project layout and a programmable backend.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use prebundle_lib::backend::{BuildDiagnostic, BuildError, BundleOutput, BundleRequest};
use prebundle_lib::{BundleBackend, Engine, EngineConfig, ModuleRegistry};

/// A backend that "bundles" by echoing the entry source, with programmable
/// failure, latency, styles, and extra reported inputs.
#[derive(Clone, Default)]
pub struct StubBackend {
  inner: Arc<StubInner>,
}

#[derive(Default)]
struct StubInner {
  calls: AtomicUsize,
  fail: AtomicBool,
  delay_ms: AtomicU64,
  styles: Mutex<Vec<String>>,
  extra_deps: Mutex<HashMap<PathBuf, Vec<PathBuf>>>,
}

impl StubBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn calls(&self) -> usize {
    self.inner.calls.load(Ordering::SeqCst)
  }

  pub fn set_fail(&self, fail: bool) {
    self.inner.fail.store(fail, Ordering::SeqCst);
  }

  pub fn set_delay_ms(&self, delay: u64) {
    self.inner.delay_ms.store(delay, Ordering::SeqCst);
  }

  pub fn set_styles(&self, styles: Vec<String>) {
    *self.inner.styles.lock().unwrap() = styles;
  }

  pub fn add_dep(&self, entry: PathBuf, dep: PathBuf) {
    self.inner.extra_deps.lock().unwrap().entry(entry).or_default().push(dep);
  }

  pub fn clear_deps(&self) {
    self.inner.extra_deps.lock().unwrap().clear();
  }
}

impl BundleBackend for StubBackend {
  async fn bundle(&self, request: BundleRequest) -> Result<BundleOutput, BuildError> {
    self.inner.calls.fetch_add(1, Ordering::SeqCst);

    let delay = self.inner.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    }

    if self.inner.fail.load(Ordering::SeqCst) {
      return Err(BuildError::Bundle {
        entry: request.entry.display().to_string(),
        diagnostics: vec![BuildDiagnostic {
          file: request.entry.display().to_string(),
          line: 1,
          line_text: "export default broken".to_string(),
          message: "stub failure".to_string(),
        }],
      });
    }

    let source =
      tokio::fs::read_to_string(&request.entry)
        .await
        .map_err(|e| BuildError::Backend {
          entry: request.entry.display().to_string(),
          message: e.to_string(),
        })?;

    let mut inputs = vec![request.entry.clone()];
    if let Some(extra) = self.inner.extra_deps.lock().unwrap().get(&request.entry) {
      inputs.extend(extra.iter().cloned());
    }

    Ok(BundleOutput {
      code: format!("// bundled\n{source}"),
      styles: self.inner.styles.lock().unwrap().clone(),
      inputs,
    })
  }
}

/// An isolated project tree with a `src/components/` directory.
pub struct TestProject {
  pub temp: TempDir,
}

impl TestProject {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn root(&self) -> PathBuf {
    dunce_canonicalize(self.temp.path())
  }

  pub fn write(&self, rel: &str, content: &str) -> PathBuf {
    let path = self.root().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn config(&self) -> EngineConfig {
    EngineConfig::new(self.root()).with_includes(["src/components/*.tsx"])
  }

  pub fn engine(&self, config: EngineConfig, backend: StubBackend) -> Engine<StubBackend> {
    Engine::new(config, backend).unwrap()
  }
}

fn dunce_canonicalize(path: &Path) -> PathBuf {
  dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Minimal host registry: knows which virtual ids have live modules and
/// records what got invalidated.
#[derive(Default)]
pub struct FakeRegistry {
  live: HashSet<String>,
  pub invalidated: Vec<String>,
}

impl FakeRegistry {
  pub fn with_live(ids: impl IntoIterator<Item = String>) -> Self {
    Self {
      live: ids.into_iter().collect(),
      invalidated: Vec::new(),
    }
  }
}

impl ModuleRegistry for FakeRegistry {
  fn invalidate(&mut self, virtual_id: &str) -> bool {
    if self.live.contains(virtual_id) {
      self.invalidated.push(virtual_id.to_string());
      true
    } else {
      false
    }
  }
}
