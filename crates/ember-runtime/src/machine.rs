//! Guest runtime boundary and the globals every machine receives.

use std::sync::Arc;

use ember_core::Value;

use crate::capability::ApiAdapter;

/// Global holding the host identification string.
pub const GLOBAL_HOST: &str = "_HOST";
/// Global holding the default settings string.
pub const GLOBAL_DEFAULT_SETTINGS: &str = "_DEFAULT_SETTINGS";
/// Global holding the resolved runtime backend id.
pub const GLOBAL_RUNTIME: &str = "_RUNTIME";
/// Global set to `true` when legacy features are disabled.
pub const GLOBAL_DISABLE_LEGACY_FEATURES: &str = "_DISABLE_LEGACY_FEATURES";

/// One guest scripting engine instance, owned by a single device.
///
/// Parsing and evaluation live behind this trait; the host only installs
/// globals and capabilities and tears the instance down.
pub trait GuestRuntime: Send {
    /// Set a global variable visible to scripts.
    fn set_global(&mut self, name: &str, value: Value);

    /// Publish a capability under each of its names.
    fn register_api(&mut self, api: Arc<ApiAdapter>);

    /// Release the instance. Called once, on device shutdown.
    fn unload(&mut self) {}
}

/// Per-machine settings applied at device creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSettings {
    /// Desired runtime backend id.
    pub runtime_id: String,
    /// Fallback runtime backend id.
    pub default_runtime_id: String,
    /// Value of `_HOST`.
    pub host: String,
    /// Value of `_DEFAULT_SETTINGS`.
    pub default_settings: String,
    /// Whether to set `_DISABLE_LEGACY_FEATURES`.
    pub disable_legacy_features: bool,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            runtime_id: "interpreter".to_owned(),
            default_runtime_id: "interpreter".to_owned(),
            host: concat!("ember ", env!("CARGO_PKG_VERSION")).to_owned(),
            default_settings: String::new(),
            disable_legacy_features: false,
        }
    }
}

impl MachineSettings {
    /// Install the machine globals into `runtime`. `resolved_id` is the
    /// backend that was actually selected.
    pub fn apply(&self, runtime: &mut dyn GuestRuntime, resolved_id: &str) {
        runtime.set_global(GLOBAL_HOST, Value::from(self.host.as_str()));
        runtime.set_global(
            GLOBAL_DEFAULT_SETTINGS,
            Value::from(self.default_settings.as_str()),
        );
        runtime.set_global(GLOBAL_RUNTIME, Value::from(resolved_id));
        if self.disable_legacy_features {
            runtime.set_global(GLOBAL_DISABLE_LEGACY_FEATURES, Value::Boolean(true));
        }
    }
}
