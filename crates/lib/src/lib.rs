//! prebundle-lib: partial-bundle cache and invalidation engine
//!
//! This crate provides the core types for serving a configured subset of a
//! source tree as independently prebuilt artifacts during interactive
//! development:
//! - `Engine`: owns the entry records, the reverse dependency index, and the
//!   in-flight build ledger
//! - `BundleBackend`: the boundary to the external bundler that actually
//!   transforms code
//! - `MetadataFile`: the disposable on-disk cache manifest that lets
//!   artifacts survive process restarts

pub mod backend;
pub mod config;
pub mod consts;
pub mod engine;
pub mod entries;
pub mod metadata;
pub mod paths;
pub mod style;

pub use backend::{BuildDiagnostic, BuildError, BundleBackend, BundleOutput, BundleRequest};
pub use config::EngineConfig;
pub use engine::{Engine, EntryRecord, HotUpdate, ModuleRegistry, ReconcileReport, ResolveOutcome};
pub use entries::EntryResolveError;
pub use metadata::MetadataFile;
pub use paths::PathCodec;
