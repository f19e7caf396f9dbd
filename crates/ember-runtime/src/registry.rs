//! Pluggable runtime backends and capability providers.
//!
//! Built once at start-up (`&mut` registration) and then shared, typically
//! behind an `Arc`, with device construction.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capability::{ApiAdapter, Capability};
use crate::device::DeviceAccess;
use crate::error::{RuntimeError, RuntimeResult};
use crate::machine::GuestRuntime;

/// Produces guest runtime instances for one backend.
pub trait RuntimeFactory: Send + Sync {
    /// Backend identifier, unique within a registry.
    fn id(&self) -> &str;

    /// Path of the backend's pre-BIOS script, if it has one.
    fn pre_bios(&self) -> Option<&str> {
        None
    }

    /// Create a runtime for a new device.
    ///
    /// # Errors
    ///
    /// Any error here aborts the device's bring-up.
    fn create(&self, access: &Arc<DeviceAccess>) -> RuntimeResult<Box<dyn GuestRuntime>>;
}

/// Produces at most one capability per device.
pub trait CapabilityFactory: Send + Sync {
    /// Globals the capability is published under.
    fn names(&self) -> Vec<String>;

    /// Create the capability for a device, or `None` to skip this device.
    fn create(&self, access: &Arc<DeviceAccess>) -> Option<Arc<dyn Capability>>;
}

/// Registry of runtime backends and capability factories.
#[derive(Default)]
pub struct RuntimeRegistry {
    capabilities: Vec<Arc<dyn CapabilityFactory>>,
    runtimes: HashMap<String, Arc<dyn RuntimeFactory>>,
}

impl RuntimeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability factory. Duplicates are kept.
    pub fn register_capability(&mut self, factory: Arc<dyn CapabilityFactory>) {
        debug!(names = ?factory.names(), "Registered capability factory");
        self.capabilities.push(factory);
    }

    /// Add a runtime backend, replacing any with the same id.
    ///
    /// Returns the replaced factory.
    pub fn register_runtime(
        &mut self,
        factory: Arc<dyn RuntimeFactory>,
    ) -> Option<Arc<dyn RuntimeFactory>> {
        let id = factory.id().to_owned();
        info!(runtime_id = %id, "Registered runtime backend");
        let previous = self.runtimes.insert(id, factory);
        if let Some(previous) = &previous {
            debug!(runtime_id = previous.id(), "Replaced runtime backend");
        }
        previous
    }

    /// Backend registered under `id`, without fallback.
    #[must_use]
    pub fn runtime(&self, id: &str) -> Option<Arc<dyn RuntimeFactory>> {
        self.runtimes.get(id).cloned()
    }

    /// Registered backend ids, sorted.
    #[must_use]
    pub fn runtime_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runtimes.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered capability factories.
    #[must_use]
    pub fn capability_count(&self) -> usize {
        self.capabilities.len()
    }

    /// Look up `desired`, falling back to `default` with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Configuration`] if neither id is registered.
    pub fn resolve_runtime(
        &self,
        desired: &str,
        default: &str,
    ) -> RuntimeResult<Arc<dyn RuntimeFactory>> {
        if let Some(factory) = self.runtime(desired) {
            return Ok(factory);
        }

        warn!(
            runtime_id = desired,
            fallback = default,
            "Unknown runtime backend, using default"
        );
        self.runtime(default).ok_or_else(|| {
            RuntimeError::Configuration(format!(
                "no runtime backend '{desired}' or default '{default}' registered"
            ))
        })
    }

    /// Pre-BIOS path of the backend `desired` resolves to.
    ///
    /// # Errors
    ///
    /// As [`RuntimeRegistry::resolve_runtime`].
    pub fn pre_bios(&self, desired: &str, default: &str) -> RuntimeResult<Option<String>> {
        Ok(self
            .resolve_runtime(desired, default)?
            .pre_bios()
            .map(str::to_owned))
    }

    /// Instantiate every capability factory for a device.
    ///
    /// Factories that decline are skipped.
    #[must_use]
    pub fn create_adapters(&self, access: &Arc<DeviceAccess>) -> Vec<Arc<ApiAdapter>> {
        self.capabilities
            .iter()
            .filter_map(|factory| {
                let Some(capability) = factory.create(access) else {
                    debug!(
                        device_id = %access.id(),
                        names = ?factory.names(),
                        "Capability factory declined device"
                    );
                    return None;
                };
                Some(Arc::new(ApiAdapter::new(factory.names(), capability)))
            })
            .collect()
    }
}

impl std::fmt::Debug for RuntimeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeRegistry")
            .field("runtimes", &self.runtime_ids())
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, Option<&'static str>);

    impl RuntimeFactory for Named {
        fn id(&self) -> &str {
            self.0
        }
        fn pre_bios(&self) -> Option<&str> {
            self.1
        }
        fn create(&self, _access: &Arc<DeviceAccess>) -> RuntimeResult<Box<dyn GuestRuntime>> {
            Err(RuntimeError::Configuration("not used".into()))
        }
    }

    fn registry(ids: &[&'static str]) -> RuntimeRegistry {
        let mut registry = RuntimeRegistry::new();
        for &id in ids {
            registry.register_runtime(Arc::new(Named(id, None)));
        }
        registry
    }

    #[test]
    fn test_resolve_desired() {
        let registry = registry(&["fast", "safe"]);
        assert_eq!(registry.resolve_runtime("fast", "safe").unwrap().id(), "fast");
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let registry = registry(&["fast", "safe"]);
        assert_eq!(
            registry.resolve_runtime("missing", "safe").unwrap().id(),
            "safe"
        );
    }

    #[test]
    fn test_resolve_without_default_fails() {
        let registry = registry(&["fast"]);
        assert!(matches!(
            registry.resolve_runtime("missing", "safe"),
            Err(RuntimeError::Configuration(_))
        ));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = RuntimeRegistry::new();
        assert!(registry.register_runtime(Arc::new(Named("fast", None))).is_none());
        let replaced = registry.register_runtime(Arc::new(Named("fast", Some("rom/pre.lua"))));
        assert!(replaced.is_some());
        assert_eq!(registry.runtime_ids(), vec!["fast".to_string()]);
        assert_eq!(
            registry.pre_bios("fast", "fast").unwrap().as_deref(),
            Some("rom/pre.lua")
        );
    }

    #[test]
    fn test_runtime_lookup_has_no_fallback() {
        let registry = registry(&["safe"]);
        assert!(registry.runtime("missing").is_none());
        assert!(registry.runtime("safe").is_some());
        assert_eq!(registry.pre_bios("missing", "safe").unwrap(), None);
    }
}
