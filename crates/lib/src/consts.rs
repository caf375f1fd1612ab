//! Shared constants for artifact naming and cache layout.

/// Namespace prefix for virtual module addresses. The part after the prefix
/// is the entry's root-relative path.
pub const VIRTUAL_PREFIX: &str = "virtual:prebundle:";

/// File name of the persisted cache manifest inside the cache directory.
pub const METADATA_FILENAME: &str = "_metadata.json";

/// File name prefix for cached artifacts (`pb-<hash>.js`).
pub const ARTIFACT_PREFIX: &str = "pb-";

/// Element id prefix for injected style tags (`pb-style-<hash>`).
pub const STYLE_ID_PREFIX: &str = "pb-style-";

/// Length of the truncated entry-path digest used in artifact names.
pub const ENTRY_HASH_LEN: usize = 12;

/// Environment variable overriding the cache directory location.
pub const CACHE_DIR_ENV: &str = "PREBUNDLE_CACHE_DIR";

/// Default cache directory name under the project root.
pub const DEFAULT_CACHE_DIR: &str = ".prebundle";
