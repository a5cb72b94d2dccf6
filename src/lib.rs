//! AssetForge Core - Asset Pipeline Engine
//!
//! # Guarantees
//! 1. Filters fire only when every restriction passes
//! 2. Load hooks run before dump hooks, both in insertion order
//! 3. Dump hooks compose: each sees the previous filter's output
//! 4. Fingerprints change iff built content changes
//! 5. Failures abort the asset's build and never leave partial output

pub mod asset;
pub mod config;
pub mod engines;
pub mod filesystem;
pub mod filter;
pub mod group;
pub mod hashing;
pub mod manifest;
pub mod paths;
pub mod registry;

pub use asset::{Asset, BuildError, FilterPhase, FilterSpec, PreparedFilters, UNORDERED};
pub use config::{ConfigError, PipelineConfig};
pub use filesystem::{Filesystem, FilesystemError, LocalFilesystem};
pub use filter::{
    BuildKind, EngineError, Filter, FilterContext, FilterEngine, FilterError, ResolutionError,
    Restriction,
};
pub use group::AssetGroup;
pub use hashing::{canonical_json, compute_manifest_hash, fingerprint};
pub use manifest::{BuildManifest, ManifestEntry};
pub use registry::{FilterFactory, FilterRegistry};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
