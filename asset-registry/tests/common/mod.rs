#![allow(dead_code)]

use asset_registry::bundle_format::{write_bundle, EntrySource};
use asset_registry::{AssetRegistry, ManifestBundleService, PathResolver};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes a bundle built from `(name, type_name, data)` triples, optionally
/// prefixed with `junk` bytes.
pub fn write_bundle_file(dir: &Path, file: &str, entries: &[(&str, &str, &[u8])], junk: usize) -> PathBuf {
    let sources: Vec<EntrySource<'_>> = entries
        .iter()
        .map(|(name, tag, data)| EntrySource::new(name, tag, data))
        .collect();
    let mut bytes = vec![0xA5u8; junk];
    bytes.extend(write_bundle(&sources).unwrap());
    let path = dir.join(file);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn manifest_service(dir: &Path, json: &str) -> Arc<ManifestBundleService> {
    Arc::new(ManifestBundleService::from_json_str(dir, json).unwrap())
}

pub fn packaged_registry(service: Arc<ManifestBundleService>) -> AssetRegistry {
    AssetRegistry::new(PathResolver::packaged(Some(service)))
}

/// Polls until nothing is in flight; returns the number of polls.
pub fn drive(registry: &mut AssetRegistry) -> usize {
    let mut polls = 0;
    while registry.in_flight_count() > 0 {
        registry.poll();
        polls += 1;
        assert!(polls < 10_000, "loads never settled");
    }
    polls
}

pub const UI_MANIFEST: &str = r#"{
    "bundles": {
        "ui/icon": { "file": "ui.bundle" },
        "ui/icon.hd": { "file": "ui_hd.bundle" }
    }
}"#;
