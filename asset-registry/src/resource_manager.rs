use std::sync::Arc;

use crate::asset::{Asset, AssetRef};
use crate::config::ResourceConfig;
use crate::error::LoadError;
use crate::location::{Location, ResolvedKey};
use crate::registry::{AssetRegistry, LoadHandle, LoadStatus};
use crate::resolver::PathResolver;
use crate::services::{BundleService, DecryptService};
use crate::timer::RepeatTimer;

/// Runtime backends handed to [`ResourceManager::on_create`]. Both may be absent.
#[derive(Clone, Default)]
pub struct ResourceServices {
    pub bundles: Option<Arc<dyn BundleService>>,
    pub decrypt: Option<Arc<dyn DecryptService>>,
}

/// Host-facing wrapper: owns the registry and the auto-release timer, and is
/// ticked once per frame.
pub struct ResourceManager {
    config: ResourceConfig,
    registry: AssetRegistry,
    release_timer: RepeatTimer,
}

impl ResourceManager {
    pub fn on_create(config: ResourceConfig, services: ResourceServices) -> Self {
        let resolver = if config.simulation_on_editor {
            PathResolver::simulation(&config.location_root)
        } else {
            PathResolver::packaged(services.bundles)
        };
        let registry = AssetRegistry::new(resolver)
            .with_decrypt(services.decrypt)
            .with_stream_chunk_bytes(config.stream_chunk_bytes);
        let release_timer = RepeatTimer::new(config.auto_release_interval_secs);
        tracing::info!(
            root = %config.location_root.display(),
            simulation = config.simulation_on_editor,
            auto_release = config.auto_release_interval_secs,
            "resource manager created"
        );
        Self {
            config,
            registry,
            release_timer,
        }
    }

    /// Per-frame tick: advance loads, then sweep when the release timer fires.
    pub fn on_update(&mut self, delta_secs: f32) {
        self.registry.poll();
        if self.release_timer.update(delta_secs) {
            self.registry.release();
        }
    }

    pub fn on_diagnostics_draw(&self) -> String {
        let mode = if self.registry.is_simulation() {
            "simulation"
        } else {
            "bundle"
        };
        format!(
            "mode: {} | loaders: {} | in flight: {} | failed: {}",
            mode,
            self.registry.loader_count(),
            self.registry.in_flight_count(),
            self.registry.failed_count()
        )
    }

    pub fn release(&mut self) -> usize {
        self.registry.release()
    }

    /// Also restarts the auto-release period.
    pub fn force_release_all(&mut self) -> usize {
        self.release_timer.reset();
        self.registry.force_release_all()
    }

    /// Single-file typed load without a variant.
    pub fn load<T: Asset>(&mut self, location: impl Into<Location>) -> Result<AssetRef<T>, LoadError> {
        self.registry.load_sync(location, None)
    }

    pub fn load_sync<T: Asset>(
        &mut self,
        location: impl Into<Location>,
        variant: Option<&str>,
    ) -> Result<AssetRef<T>, LoadError> {
        self.registry.load_sync(location, variant)
    }

    pub fn load_async<T: Asset>(
        &mut self,
        location: impl Into<Location>,
        variant: Option<&str>,
    ) -> Result<LoadHandle<T>, LoadError> {
        self.registry.load_async(location, variant)
    }

    pub fn check<T: Asset>(&self, handle: &LoadHandle<T>) -> LoadStatus<T> {
        self.registry.check(handle)
    }

    pub fn release_ref(&mut self, key: &ResolvedKey) -> bool {
        self.registry.release_ref(key)
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AssetRegistry {
        &mut self.registry
    }
}
