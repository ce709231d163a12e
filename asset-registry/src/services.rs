//! Pluggable backends consumed by the registry: the bundle service that maps
//! locations to bundle files, and the optional decrypt service applied to raw
//! bundle bytes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DecryptError, ServiceError};
use crate::location::{normalize, Location};

/// Bundle-relative manifest key. Stored lower-cased and normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ManifestKey(String);

impl ManifestKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        ManifestKey(normalize(raw.as_ref()).to_lowercase())
    }

    /// Default joining convention: `ui/icon` or `ui/icon.hd`.
    pub fn from_location(location: &Location, variant: Option<&str>) -> Self {
        match variant {
            Some(v) => ManifestKey::new(format!("{}.{}", location.as_str(), v)),
            None => ManifestKey::new(location.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ManifestKey {
    fn from(raw: String) -> Self {
        ManifestKey::new(raw)
    }
}

impl From<ManifestKey> for String {
    fn from(key: ManifestKey) -> Self {
        key.0
    }
}

impl fmt::Display for ManifestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait BundleService: Send + Sync {
    fn manifest_key(
        &self,
        location: &Location,
        variant: Option<&str>,
    ) -> Result<ManifestKey, ServiceError> {
        Ok(ManifestKey::from_location(location, variant))
    }

    fn bundle_path(&self, key: &ManifestKey) -> Result<PathBuf, ServiceError>;

    /// Companion bundles that must be loaded alongside `key`.
    fn dependencies(&self, _key: &ManifestKey) -> Result<Vec<ManifestKey>, ServiceError> {
        Ok(Vec::new())
    }
}

pub trait DecryptService: Send + Sync {
    fn decrypt(&self, raw: Vec<u8>) -> Result<Vec<u8>, DecryptError>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BundleManifest {
    #[serde(default)]
    pub bundles: BTreeMap<ManifestKey, ManifestEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Bundle file, relative to the service's bundle directory.
    pub file: PathBuf,
    #[serde(default)]
    pub dependencies: Vec<ManifestKey>,
}

/// Bundle service backed by a JSON manifest and a directory of bundle files.
pub struct ManifestBundleService {
    bundle_dir: PathBuf,
    manifest: BundleManifest,
}

impl ManifestBundleService {
    pub fn new(bundle_dir: impl Into<PathBuf>, manifest: BundleManifest) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            manifest,
        }
    }

    pub fn from_json_str(bundle_dir: impl Into<PathBuf>, json: &str) -> Result<Self, ServiceError> {
        let manifest: BundleManifest = serde_json::from_str(json)?;
        Ok(Self::new(bundle_dir, manifest))
    }

    pub fn from_json_file(
        bundle_dir: impl Into<PathBuf>,
        manifest_path: impl AsRef<Path>,
    ) -> Result<Self, ServiceError> {
        let text = std::fs::read_to_string(manifest_path)?;
        Self::from_json_str(bundle_dir, &text)
    }

    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    fn entry(&self, key: &ManifestKey) -> Result<&ManifestEntry, ServiceError> {
        self.manifest
            .bundles
            .get(key)
            .ok_or_else(|| ServiceError::UnknownKey(key.to_string()))
    }
}

impl BundleService for ManifestBundleService {
    fn bundle_path(&self, key: &ManifestKey) -> Result<PathBuf, ServiceError> {
        Ok(self.bundle_dir.join(&self.entry(key)?.file))
    }

    fn dependencies(&self, key: &ManifestKey) -> Result<Vec<ManifestKey>, ServiceError> {
        Ok(self.entry(key)?.dependencies.clone())
    }
}

/// Offset-style obfuscation: the first `offset` bytes of every bundle file are junk.
#[derive(Debug, Clone, Copy)]
pub struct OffsetDecrypt {
    offset: usize,
}

impl OffsetDecrypt {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }
}

impl DecryptService for OffsetDecrypt {
    fn decrypt(&self, mut raw: Vec<u8>) -> Result<Vec<u8>, DecryptError> {
        if raw.len() < self.offset {
            return Err(DecryptError(format!(
                "input of {} bytes is shorter than offset {}",
                raw.len(),
                self.offset
            )));
        }
        raw.drain(..self.offset);
        Ok(raw)
    }
}
