//! Cache lifecycle: persistence, restart reuse, reconfiguration convergence,
//! and failure behavior.

use prebundle_lib::{BuildError, MetadataFile};

use crate::common::{StubBackend, TestProject};

#[tokio::test]
async fn build_writes_artifact_and_relative_metadata() {
  let project = TestProject::new();
  project.write("src/components/Keep.tsx", "export default function Keep(){ return 'keep'; }");
  project.write("src/components/Drop.tsx", "export default function Drop(){ return 'drop'; }");

  let backend = StubBackend::new();
  let engine = project.engine(
    project.config().with_excludes(["src/components/Drop.tsx"]),
    backend.clone(),
  );

  let report = engine.reconcile().await;
  assert_eq!(report.built, 1);
  assert_eq!(report.failed, 0);
  engine.flush_metadata().await;

  let metadata = MetadataFile::load(&engine.cache_dir().join("_metadata.json")).await;
  assert!(metadata.entries.contains_key("src/components/Keep.tsx"));
  assert!(!metadata.entries.contains_key("src/components/Drop.tsx"));

  let keep = &metadata.entries["src/components/Keep.tsx"];
  assert!(!keep.output.starts_with('/'));
  assert!(keep.deps.iter().all(|d| !d.starts_with('/')));
  assert!(keep.deps.contains(&"src/components/Keep.tsx".to_string()));
  assert_eq!(keep.virtual_id, "virtual:prebundle:src/components/Keep.tsx");

  let artifact = engine.cache_dir().join(format!("pb-{}.js", keep.hash));
  let text = std::fs::read_to_string(artifact).unwrap();
  assert!(text.contains("return 'keep'"));
}

#[tokio::test]
async fn restart_with_same_config_reuses_artifact() {
  let project = TestProject::new();
  let entry = project.write("src/components/Keep.tsx", "export default 'keep';");

  let first_backend = StubBackend::new();
  let engine = project.engine(project.config(), first_backend.clone());
  engine.reconcile().await;
  engine.flush_metadata().await;
  assert_eq!(first_backend.calls(), 1);

  let record = engine.record(&entry).unwrap();
  let mtime_before = std::fs::metadata(&record.output).unwrap().modified().unwrap();
  drop(engine);

  // Fresh engine, unchanged configuration: the backend must not run again.
  let second_backend = StubBackend::new();
  let engine = project.engine(project.config(), second_backend.clone());
  let report = engine.reconcile().await;
  assert_eq!(report.reused, 1);
  assert_eq!(report.built, 0);
  assert_eq!(second_backend.calls(), 0);

  let mtime_after = std::fs::metadata(&record.output).unwrap().modified().unwrap();
  assert_eq!(mtime_before, mtime_after);

  let vid = "virtual:prebundle:src/components/Keep.tsx";
  let loaded = engine.load_artifact(vid).await.unwrap().unwrap();
  assert!(!loaded.is_empty());
  assert_eq!(second_backend.calls(), 0);
}

#[tokio::test]
async fn reconfiguration_converges_to_configured_set() {
  let project = TestProject::new();
  project.write("src/components/Keep.tsx", "export default 'keep';");
  project.write("src/components/Drop.tsx", "export default 'drop';");

  let engine = project.engine(project.config(), StubBackend::new());
  engine.reconcile().await;
  engine.flush_metadata().await;

  let metadata = MetadataFile::load(&engine.cache_dir().join("_metadata.json")).await;
  let drop_output = engine.codec().abs_path(&metadata.entries["src/components/Drop.tsx"].output);
  assert!(drop_output.exists());
  drop(engine);

  // Narrow the configuration to Keep only.
  let narrowed = project.config().with_includes(["src/components/Keep.tsx"]);
  let engine = project.engine(narrowed, StubBackend::new());
  let report = engine.reconcile().await;
  assert_eq!(report.removed, 1);
  engine.flush_metadata().await;

  let metadata = MetadataFile::load(&engine.cache_dir().join("_metadata.json")).await;
  assert!(metadata.entries.contains_key("src/components/Keep.tsx"));
  assert!(!metadata.entries.contains_key("src/components/Drop.tsx"));
  assert!(!drop_output.exists());
}

#[tokio::test]
async fn failed_rebuild_preserves_last_good_artifact() {
  let project = TestProject::new();
  let entry = project.write("src/components/Keep.tsx", "export default 'v1';");

  let backend = StubBackend::new();
  let engine = project.engine(project.config(), backend.clone());
  engine.reconcile().await;

  let record = engine.record(&entry).unwrap();
  let good = std::fs::read(&record.output).unwrap();

  backend.set_fail(true);
  let err = engine.rebuild(&entry).await.unwrap_err();
  assert!(matches!(err, BuildError::Bundle { .. }));

  // Artifact and record are untouched; the entry still serves.
  assert_eq!(std::fs::read(&record.output).unwrap(), good);
  assert_eq!(engine.record(&entry).unwrap(), record);
  let served = engine
    .load_artifact("virtual:prebundle:src/components/Keep.tsx")
    .await
    .unwrap()
    .unwrap();
  assert!(served.contains("v1"));
}

#[tokio::test]
async fn style_output_gets_injected_runtime() {
  let project = TestProject::new();
  project.write("src/components/Styled.tsx", "export default 'styled';");

  let backend = StubBackend::new();
  backend.set_styles(vec![".styled{color:red}".to_string()]);
  let engine = project.engine(project.config(), backend);
  engine.reconcile().await;

  let text = engine
    .load_artifact("virtual:prebundle:src/components/Styled.tsx")
    .await
    .unwrap()
    .unwrap();
  assert!(text.contains("document.createElement('style')"));
  assert!(text.contains(".styled{color:red}"));
  assert!(text.contains("pb-style-"));
}

#[tokio::test]
async fn style_injection_can_be_disabled() {
  let project = TestProject::new();
  project.write("src/components/Styled.tsx", "export default 'styled';");

  let backend = StubBackend::new();
  backend.set_styles(vec![".styled{color:red}".to_string()]);
  let engine = project.engine(project.config().with_inject_styles(false), backend);
  engine.reconcile().await;

  let text = engine
    .load_artifact("virtual:prebundle:src/components/Styled.tsx")
    .await
    .unwrap()
    .unwrap();
  assert!(!text.contains("document.createElement"));
}

#[tokio::test]
async fn remove_entry_drops_artifact_record_and_metadata() {
  let project = TestProject::new();
  let entry = project.write("src/components/Keep.tsx", "export default 'keep';");

  let engine = project.engine(project.config(), StubBackend::new());
  engine.reconcile().await;
  let record = engine.record(&entry).unwrap();

  engine.remove_entry(&entry).await;
  engine.flush_metadata().await;

  assert!(engine.record(&entry).is_none());
  assert!(!record.output.exists());
  let metadata = MetadataFile::load(&engine.cache_dir().join("_metadata.json")).await;
  assert!(metadata.entries.is_empty());
}

#[tokio::test]
async fn corrupt_metadata_degrades_to_rebuild() {
  let project = TestProject::new();
  project.write("src/components/Keep.tsx", "export default 'keep';");

  let backend = StubBackend::new();
  let engine = project.engine(project.config(), backend.clone());
  std::fs::create_dir_all(engine.cache_dir()).unwrap();
  std::fs::write(engine.cache_dir().join("_metadata.json"), "{{{ not json").unwrap();

  let report = engine.reconcile().await;
  assert_eq!(report.built, 1);
  assert_eq!(backend.calls(), 1);
}
