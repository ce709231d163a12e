use thiserror::Error;

use crate::location::ResolvedKey;

/// Failure reported to callers of the load entry points.
///
/// Every variant except `Configuration` is stored inside the failed loader and
/// handed out again to each later requester of the same key, hence `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("cannot resolve {key}: {reason}")]
    Resolution { key: String, reason: String },
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("decrypt failed for {path}: {message}")]
    Decrypt { path: String, message: String },
    #[error("type mismatch for {key}: requested {requested}, found {found}")]
    TypeMismatch {
        key: String,
        requested: String,
        found: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LoadError {
    pub(crate) fn resolution(key: &ResolvedKey, reason: impl Into<String>) -> Self {
        LoadError::Resolution {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, message: impl ToString) -> Self {
        LoadError::Io {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn type_mismatch(key: &ResolvedKey, requested: &str, found: &str) -> Self {
        LoadError::TypeMismatch {
            key: key.to_string(),
            requested: requested.to_string(),
            found: found.to_string(),
        }
    }

    /// Maps a bundle read failure for `path`: a missing entry means nothing
    /// resolvable was found, everything else is a failed or corrupt read.
    pub(crate) fn from_bundle(key: &ResolvedKey, path: &std::path::Path, err: BundleError) -> Self {
        match err {
            BundleError::EntryNotFound(name) => {
                LoadError::resolution(key, format!("bundle {} has no entry '{}'", path.display(), name))
            }
            other => LoadError::io(path, other),
        }
    }
}

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid bundle: {0}")]
    InvalidBundle(String),
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("checksum mismatch for entry {0}")]
    ChecksumMismatch(String),
    #[error("resource limits exceeded: {0}")]
    ResourceLimit(String),
}

/// Failure of a bundle service backend. Always surfaces as a resolution failure.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("unknown manifest key: {0}")]
    UnknownKey(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest decode: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecryptError(pub String);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
