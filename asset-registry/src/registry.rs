use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::asset::{Asset, AssetRef, PayloadDecoder};
use crate::error::LoadError;
use crate::loader::{LoadContext, Loader, LoaderState, DEFAULT_STREAM_CHUNK_BYTES};
use crate::location::{Location, ResolvedKey};
use crate::resolver::PathResolver;
use crate::services::DecryptService;

/// Ticket for an asynchronous load; its completion is observed with
/// [`AssetRegistry::check`] after `poll` has run.
pub struct LoadHandle<T> {
    key: ResolvedKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LoadHandle<T> {
    fn new(key: ResolvedKey) -> Self {
        LoadHandle {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &ResolvedKey {
        &self.key
    }
}

impl<T> Clone for LoadHandle<T> {
    fn clone(&self) -> Self {
        LoadHandle::new(self.key.clone())
    }
}

impl<T> fmt::Debug for LoadHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadHandle").field(&self.key).finish()
    }
}

pub enum LoadStatus<T> {
    InFlight,
    Ready(AssetRef<T>),
    Failed(LoadError),
    /// The loader is gone (force released); the handle is stale.
    Evicted,
}

impl<T> LoadStatus<T> {
    pub fn is_done(&self) -> bool {
        !matches!(self, LoadStatus::InFlight)
    }

    pub fn ready(self) -> Option<AssetRef<T>> {
        match self {
            LoadStatus::Ready(asset) => Some(asset),
            _ => None,
        }
    }
}

impl<T> fmt::Debug for LoadStatus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::InFlight => f.write_str("InFlight"),
            LoadStatus::Ready(asset) => f.debug_tuple("Ready").field(asset.key()).finish(),
            LoadStatus::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            LoadStatus::Evicted => f.write_str("Evicted"),
        }
    }
}

/// Read-only snapshot of one loader, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderInfo {
    pub key: ResolvedKey,
    pub state: LoaderState,
    pub ref_count: u32,
    pub type_name: &'static str,
    pub error: Option<LoadError>,
}

impl LoaderInfo {
    fn of(loader: &Loader) -> Self {
        LoaderInfo {
            key: loader.key().clone(),
            state: loader.state(),
            ref_count: loader.ref_count(),
            type_name: loader.type_name(),
            error: loader.error().cloned(),
        }
    }
}

/// Map from resolved key to loader, with at most one loader per key.
///
/// All mutation happens on the caller's thread: inside `load_sync`,
/// `load_async`, `poll`, `release` and `force_release_all`.
pub struct AssetRegistry {
    resolver: PathResolver,
    decrypt: Option<Arc<dyn DecryptService>>,
    loaders: HashMap<ResolvedKey, Loader>,
    failed: usize,
    chunk_bytes: usize,
}

impl AssetRegistry {
    pub fn new(resolver: PathResolver) -> Self {
        AssetRegistry {
            resolver,
            decrypt: None,
            loaders: HashMap::new(),
            failed: 0,
            chunk_bytes: DEFAULT_STREAM_CHUNK_BYTES,
        }
    }

    pub fn with_decrypt(mut self, decrypt: Option<Arc<dyn DecryptService>>) -> Self {
        self.decrypt = decrypt;
        self
    }

    /// Bytes read per loader per `poll` on the asynchronous path.
    pub fn with_stream_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn is_simulation(&self) -> bool {
        self.resolver.is_simulation()
    }

    /// Blocking load. The reference count is incremented only on success.
    ///
    /// Dependency bundles are not loaded on this path. A request for a key
    /// whose asynchronous load is still in flight finishes that load inline.
    pub fn load_sync<T: Asset>(
        &mut self,
        location: impl Into<Location>,
        variant: Option<&str>,
    ) -> Result<AssetRef<T>, LoadError> {
        let key = ResolvedKey::new(location, variant);
        let ctx = LoadContext {
            decrypt: self.decrypt.as_deref(),
            chunk_bytes: usize::MAX,
        };

        if let Some(loader) = self.loaders.get_mut(&key) {
            check_type::<T>(loader)?;
            if !loader.state().is_terminal() {
                tracing::debug!(key = %key, "completing in-flight load synchronously");
                loader.complete_blocking(&ctx);
                if loader.state() == LoaderState::Failed {
                    self.failed += 1;
                }
            }
            return acquire_typed::<T>(loader);
        }

        self.resolver.ensure_ready()?;
        let mut loader = Loader::new(key.clone(), PayloadDecoder::of::<T>());
        tracing::debug!(key = %key, asset_type = T::TYPE_NAME, "loader created (sync)");
        match self.resolver.resolve(&key) {
            Ok(target) => loader.load_blocking(target, &ctx),
            Err(err) => loader.fail(err),
        }
        if loader.state() == LoaderState::Failed {
            self.failed += 1;
        }
        let result = acquire_typed::<T>(&mut loader);
        self.loaders.insert(key, loader);
        result
    }

    /// Deferred load driven by [`poll`](Self::poll).
    ///
    /// One reference is taken immediately and belongs to the caller whatever
    /// the outcome; concurrent requests for the same key attach to the same
    /// loader. Resolution failures are reported through the handle; only a
    /// missing service or a type clash with the existing loader fail here.
    pub fn load_async<T: Asset>(
        &mut self,
        location: impl Into<Location>,
        variant: Option<&str>,
    ) -> Result<LoadHandle<T>, LoadError> {
        let key = ResolvedKey::new(location, variant);

        if let Some(loader) = self.loaders.get_mut(&key) {
            check_type::<T>(loader)?;
            loader.acquire();
            tracing::debug!(key = %key, refs = loader.ref_count(), "attached to existing loader");
            return Ok(LoadHandle::new(key));
        }

        self.resolver.ensure_ready()?;
        let mut loader = Loader::new(key.clone(), PayloadDecoder::of::<T>());
        tracing::debug!(key = %key, asset_type = T::TYPE_NAME, "loader created (async)");
        match self.resolver.resolve(&key) {
            Ok(target) => loader.start_stream(target),
            Err(err) => {
                loader.fail(err);
                self.failed += 1;
            }
        }
        loader.acquire();
        self.loaders.insert(key.clone(), loader);
        Ok(LoadHandle::new(key))
    }

    /// Observe an asynchronous load. Does not touch the reference count.
    pub fn check<T: Asset>(&self, handle: &LoadHandle<T>) -> LoadStatus<T> {
        let Some(loader) = self.loaders.get(handle.key()) else {
            return LoadStatus::Evicted;
        };
        match loader.outcome::<T>() {
            None => LoadStatus::InFlight,
            Some(Ok(asset)) => LoadStatus::Ready(AssetRef::new(handle.key().clone(), asset)),
            Some(Err(err)) => LoadStatus::Failed(err),
        }
    }

    /// Drop one consumer reference. Returns false if no loader exists for `key`.
    pub fn release_ref(&mut self, key: &ResolvedKey) -> bool {
        match self.loaders.get_mut(key) {
            Some(loader) => {
                loader.release();
                true
            }
            None => false,
        }
    }

    /// Advance every unfinished loader by exactly one unit of work.
    /// Returns how many loaders were advanced.
    pub fn poll(&mut self) -> usize {
        let ctx = LoadContext {
            decrypt: self.decrypt.as_deref(),
            chunk_bytes: self.chunk_bytes,
        };
        let mut advanced = 0;
        for loader in self.loaders.values_mut() {
            if !loader.step(&ctx) {
                continue;
            }
            advanced += 1;
            if loader.state() == LoaderState::Failed {
                self.failed += 1;
            }
        }
        if advanced > 0 {
            tracing::trace!(advanced, "poll");
        }
        advanced
    }

    /// Destroy every loader with no references in a terminal state.
    /// Returns how many were evicted.
    pub fn release(&mut self) -> usize {
        let before = self.loaders.len();
        let mut evicted_failed = 0;
        self.loaders.retain(|key, loader| {
            if !loader.is_evictable() {
                return true;
            }
            if loader.state() == LoaderState::Failed {
                evicted_failed += 1;
            }
            tracing::debug!(key = %key, state = loader.state().as_str(), "evicting loader");
            false
        });
        self.failed -= evicted_failed;
        let evicted = before - self.loaders.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.loaders.len(), "released unused loaders");
        }
        evicted
    }

    /// Destroy every loader regardless of references or state. Outstanding
    /// `AssetRef`s keep their payload alive but are no longer tracked, and
    /// outstanding `LoadHandle`s report `Evicted`.
    pub fn force_release_all(&mut self) -> usize {
        let count = self.loaders.len();
        let referenced = self.loaders.values().filter(|l| l.ref_count() > 0).count();
        self.loaders.clear();
        self.failed = 0;
        tracing::info!(count, referenced, "force released all loaders");
        count
    }

    pub fn loader_count(&self) -> usize {
        self.loaders.len()
    }

    /// Loaders currently in `Failed`, maintained incrementally.
    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn in_flight_count(&self) -> usize {
        self.loaders
            .values()
            .filter(|l| !l.state().is_terminal())
            .count()
    }

    pub fn state(&self, key: &ResolvedKey) -> Option<LoaderState> {
        self.loaders.get(key).map(Loader::state)
    }

    pub fn ref_count(&self, key: &ResolvedKey) -> Option<u32> {
        self.loaders.get(key).map(Loader::ref_count)
    }

    pub fn loader_info(&self, key: &ResolvedKey) -> Option<LoaderInfo> {
        self.loaders.get(key).map(LoaderInfo::of)
    }

    /// Snapshots of every loader, ordered by key.
    pub fn loaders(&self) -> Vec<LoaderInfo> {
        let mut infos: Vec<LoaderInfo> = self.loaders.values().map(LoaderInfo::of).collect();
        infos.sort_by_key(|info| info.key.to_string());
        infos
    }
}

fn check_type<T: Asset>(loader: &Loader) -> Result<(), LoadError> {
    if loader.serves::<T>() {
        Ok(())
    } else {
        Err(LoadError::type_mismatch(
            loader.key(),
            T::TYPE_NAME,
            loader.type_name(),
        ))
    }
}

fn acquire_typed<T: Asset>(loader: &mut Loader) -> Result<AssetRef<T>, LoadError> {
    match loader.outcome::<T>() {
        Some(Ok(asset)) => {
            loader.acquire();
            Ok(AssetRef::new(loader.key().clone(), asset))
        }
        Some(Err(err)) => Err(err),
        None => Err(LoadError::resolution(loader.key(), "load did not complete")),
    }
}
