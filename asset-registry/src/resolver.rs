use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::{LoadError, ServiceError};
use crate::location::{Location, ResolvedKey};
use crate::services::{BundleService, ManifestKey};

/// Everything a loader needs to read one bundle-mode asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTarget {
    pub manifest_key: ManifestKey,
    pub bundle_path: PathBuf,
    pub dependencies: Vec<PathBuf>,
    /// Entry name inside the bundle: the last location segment.
    pub asset_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// Simulation mode: the source file (or directory) itself.
    Direct(PathBuf),
    Bundle(BundleTarget),
}

/// Location-to-source strategy, chosen once at initialization.
#[derive(Clone)]
pub enum PathResolver {
    Simulation { root: PathBuf },
    Packaged { bundles: Option<Arc<dyn BundleService>> },
}

impl PathResolver {
    pub fn simulation(root: impl Into<PathBuf>) -> Self {
        PathResolver::Simulation { root: root.into() }
    }

    pub fn packaged(bundles: Option<Arc<dyn BundleService>>) -> Self {
        PathResolver::Packaged { bundles }
    }

    pub fn is_simulation(&self) -> bool {
        matches!(self, PathResolver::Simulation { .. })
    }

    /// Fails only when a required service is missing.
    pub fn ensure_ready(&self) -> Result<(), LoadError> {
        match self {
            PathResolver::Packaged { bundles: None } => Err(LoadError::Configuration(
                "no bundle service configured while not in simulation mode".into(),
            )),
            _ => Ok(()),
        }
    }

    pub fn resolve(&self, key: &ResolvedKey) -> Result<ResolvedTarget, LoadError> {
        let location = key.location();
        if location.is_empty() {
            return Err(LoadError::resolution(key, "empty location"));
        }
        if location.escapes_root() {
            return Err(LoadError::resolution(key, "location climbs above the root"));
        }
        match self {
            PathResolver::Simulation { root } => find_source_file(root, location)
                .map(ResolvedTarget::Direct)
                .ok_or_else(|| {
                    LoadError::resolution(key, format!("no source file under {}", root.display()))
                }),
            PathResolver::Packaged { bundles } => {
                let service = bundles.as_deref().ok_or_else(|| {
                    LoadError::Configuration(
                        "no bundle service configured while not in simulation mode".into(),
                    )
                })?;
                resolve_bundle(service, key).map_err(|e| LoadError::resolution(key, e.to_string()))
            }
        }
    }
}

fn resolve_bundle(service: &dyn BundleService, key: &ResolvedKey) -> Result<ResolvedTarget, ServiceError> {
    let manifest_key = service.manifest_key(key.location(), key.variant())?;
    let bundle_path = service.bundle_path(&manifest_key)?;
    let dependencies = service
        .dependencies(&manifest_key)?
        .iter()
        .map(|dep| service.bundle_path(dep))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResolvedTarget::Bundle(BundleTarget {
        manifest_key,
        bundle_path,
        dependencies,
        asset_name: key.location().name().to_string(),
    }))
}

/// Simulation lookup: a directory location resolves to itself, otherwise the
/// containing folder is scanned for a file whose stem is the last segment.
/// `.meta` side files are ignored. `None` when nothing matches or the
/// location climbs above `root`.
pub fn find_source_file(root: &Path, location: &Location) -> Option<PathBuf> {
    if location.escapes_root() {
        return None;
    }
    let direct = root.join(location.as_str());
    if direct.is_dir() || direct.is_file() {
        return Some(direct);
    }

    let folder = root.join(location.parent());
    let stem = location.name();
    let mut matches: Vec<PathBuf> = WalkDir::new(&folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) != Some("meta"))
        .filter(|p| p.file_stem().and_then(|s| s.to_str()) == Some(stem))
        .collect();
    matches.sort();
    if matches.len() > 1 {
        tracing::debug!(
            location = %location,
            candidates = matches.len(),
            "several source files match, using {}",
            matches[0].display()
        );
    }
    matches.into_iter().next()
}
