//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Stub bundler: reads the JSON request from stdin, echoes the entry source
/// back as the bundled code, and reports the entry as the only input.
/// Sources must stay single-line without double quotes so the raw embed
/// remains valid JSON.
const STUB_BUNDLER: &str = r#"input=$(cat)
entry=$(printf '%s' "$input" | sed -n 's/.*"entry":"\([^"]*\)".*/\1/p')
code=$(cat "$entry")
printf '{"code":"// bundled\\n%s","styles":[],"inputs":["%s"]}\n' "$code" "$entry"
"#;

/// Isolated project tree plus a stub bundler executable.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    env.install_bundler(STUB_BUNDLER);
    env
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap_or_else(|_| self.temp.path().to_path_buf())
  }

  pub fn bundler(&self) -> PathBuf {
    self.root().join("stub-bundler.sh")
  }

  pub fn cache_dir(&self) -> PathBuf {
    self.root().join(".prebundle")
  }

  pub fn metadata_path(&self) -> PathBuf {
    self.cache_dir().join("_metadata.json")
  }

  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.root().join(relative_path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn read_metadata(&self) -> serde_json::Value {
    let raw = std::fs::read_to_string(self.metadata_path()).unwrap();
    serde_json::from_str(&raw).unwrap()
  }

  /// Get a pre-configured `prebundle build` command for this project.
  pub fn build_cmd(&self, includes: &[&str], excludes: &[&str]) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("prebundle");
    cmd.arg("build").arg("--root").arg(self.root()).arg("--backend").arg(self.bundler());
    for include in includes {
      cmd.arg("--include").arg(include);
    }
    for exclude in excludes {
      cmd.arg("--exclude").arg(exclude);
    }
    cmd
  }

  pub fn status_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("prebundle");
    cmd.arg("status").arg("--root").arg(self.root());
    cmd
  }

  pub fn clean_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("prebundle");
    cmd.arg("clean").arg("--root").arg(self.root());
    cmd
  }

  fn install_bundler(&self, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = self.temp.path().join("stub-bundler.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
  }

  /// Replace the stub with one that always reports a build failure.
  pub fn install_failing_bundler(&self) {
    self.install_bundler(
      r#"cat > /dev/null
printf '{"errors":[{"file":"src/App.tsx","line":1,"lineText":"broken","message":"stub failure"}]}\n'
"#,
    );
  }
}

/// Artifact path recorded in metadata for an entry, made absolute.
pub fn artifact_path(env: &TestEnv, meta: &serde_json::Value, entry: &str) -> PathBuf {
  let rel = meta["entries"][entry]["output"].as_str().unwrap();
  env.root().join(rel)
}
