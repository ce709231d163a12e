//! Reference-counted asset registry.
//! - locations resolve either to source files (simulation) or to entries in bundle files.
//! - one loader per (location, variant); loads run inline or one step per `poll()`.
//! - loaders with no references are reclaimed by `release()`, on demand or on a timer.
pub mod asset;
pub mod bundle;
pub mod bundle_format;
pub mod config;
pub mod error;
pub mod loader;
pub mod location;
pub mod registry;
pub mod resolver;
pub mod resource_manager;
pub mod services;
pub mod timer;

pub use asset::{Asset, AssetRef, RawBytes, TextAsset};
pub use bundle::Bundle;
pub use config::ResourceConfig;
pub use error::{BundleError, ConfigError, DecryptError, LoadError, ServiceError};
pub use loader::{Loader, LoaderState};
pub use location::{Location, ResolvedKey};
pub use registry::{AssetRegistry, LoadHandle, LoadStatus, LoaderInfo};
pub use resolver::{BundleTarget, PathResolver, ResolvedTarget};
pub use resource_manager::{ResourceManager, ResourceServices};
pub use services::{
    BundleManifest, BundleService, DecryptService, ManifestBundleService, ManifestEntry,
    ManifestKey, OffsetDecrypt,
};
pub use timer::RepeatTimer;
