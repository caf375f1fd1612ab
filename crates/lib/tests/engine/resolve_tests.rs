//! Host resolution and load hooks.

use std::path::PathBuf;

use prebundle_lib::ResolveOutcome;

use crate::common::{StubBackend, TestProject};

fn no_host_resolve(_: &str, _: Option<&std::path::Path>) -> Option<PathBuf> {
  None
}

#[tokio::test]
async fn absolute_specifier_naming_an_entry_is_accepted() {
  let project = TestProject::new();
  let entry = project.write("src/components/Card.tsx", "export default 'card';");

  let engine = project.engine(project.config(), StubBackend::new());
  let outcome = engine
    .resolve_import(entry.to_str().unwrap(), None, no_host_resolve)
    .await
    .unwrap();

  assert_eq!(
    outcome,
    ResolveOutcome::Accepted("virtual:prebundle:src/components/Card.tsx".to_string())
  );
  // Acceptance implies the entry is built and servable.
  assert!(engine.record(&entry).is_some());
}

#[tokio::test]
async fn relative_specifier_resolves_against_importer() {
  let project = TestProject::new();
  project.write("src/components/Card.tsx", "export default 'card';");
  let importer = project.write("src/pages/Home.tsx", "import Card from '../components/Card.tsx';");

  let engine = project.engine(project.config(), StubBackend::new());
  let outcome = engine
    .resolve_import("../components/Card.tsx", Some(&importer), no_host_resolve)
    .await
    .unwrap();

  assert!(matches!(outcome, ResolveOutcome::Accepted(_)));
}

#[tokio::test]
async fn importer_query_suffix_is_ignored() {
  let project = TestProject::new();
  project.write("src/components/Card.tsx", "export default 'card';");
  let importer = project.root().join("src/pages/Home.tsx?import");

  let engine = project.engine(project.config(), StubBackend::new());
  let outcome = engine
    .resolve_import("../components/Card.tsx", Some(&importer), no_host_resolve)
    .await
    .unwrap();

  assert!(matches!(outcome, ResolveOutcome::Accepted(_)));
}

#[tokio::test]
async fn host_resolver_fallback_is_consulted() {
  let project = TestProject::new();
  let entry = project.write("src/components/Card.tsx", "export default 'card';");

  let engine = project.engine(project.config(), StubBackend::new());
  let target = entry.clone();
  let outcome = engine
    .resolve_import("@components/Card", None, move |_, _| Some(target))
    .await
    .unwrap();

  assert!(matches!(outcome, ResolveOutcome::Accepted(_)));
}

#[tokio::test]
async fn non_entry_specifiers_are_declined() {
  let project = TestProject::new();
  project.write("src/components/Card.tsx", "export default 'card';");
  project.write("src/helpers/util.ts", "export {};");

  let backend = StubBackend::new();
  let engine = project.engine(project.config(), backend.clone());

  let outcome = engine
    .resolve_import(project.root().join("src/helpers/util.ts").to_str().unwrap(), None, no_host_resolve)
    .await
    .unwrap();
  assert_eq!(outcome, ResolveOutcome::Declined);

  let outcome = engine.resolve_import("react", None, no_host_resolve).await.unwrap();
  assert_eq!(outcome, ResolveOutcome::Declined);
  assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn load_declines_unknown_addresses() {
  let project = TestProject::new();
  project.write("src/components/Card.tsx", "export default 'card';");

  let engine = project.engine(project.config(), StubBackend::new());

  assert!(engine.load_artifact("not-a-virtual-id").await.unwrap().is_none());
  assert!(
    engine
      .load_artifact("virtual:prebundle:src/components/Unknown.tsx")
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn load_builds_lazily_and_serves_text() {
  let project = TestProject::new();
  project.write("src/components/Card.tsx", "export default 'card';");

  let backend = StubBackend::new();
  let engine = project.engine(project.config(), backend.clone());

  let text = engine
    .load_artifact("virtual:prebundle:src/components/Card.tsx")
    .await
    .unwrap()
    .unwrap();
  assert!(text.contains("card"));
  assert_eq!(backend.calls(), 1);
}
