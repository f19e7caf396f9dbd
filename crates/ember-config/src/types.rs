//! Configuration struct definitions.
//!
//! Every section is `#[serde(default)]`, so a file only needs to name the
//! keys it changes.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the device host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runtime backend selection and machine globals.
    pub runtime: RuntimeSection,
    /// Host task bridge limits.
    pub tasks: TasksSection,
    /// Device event queue settings.
    pub events: EventsSection,
    /// Logging and tracing configuration.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// RuntimeSection
// ---------------------------------------------------------------------------

/// Runtime backend selection and the globals exposed to scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Identifier of the desired runtime backend.
    pub id: String,
    /// Backend used when `id` is not registered.
    pub default_id: String,
    /// Host identification string (`_HOST`).
    pub host: String,
    /// Default settings string (`_DEFAULT_SETTINGS`).
    pub default_settings: String,
    /// Expose `_DISABLE_LEGACY_FEATURES` to scripts.
    pub disable_legacy_features: bool,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            id: "interpreter".to_owned(),
            default_id: "interpreter".to_owned(),
            host: concat!("ember ", env!("CARGO_PKG_VERSION")).to_owned(),
            default_settings: String::new(),
            disable_legacy_features: false,
        }
    }
}

// ---------------------------------------------------------------------------
// TasksSection
// ---------------------------------------------------------------------------

/// Limits for asynchronous host tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksSection {
    /// Maximum number of in-flight tasks across all devices.
    pub max_pending: usize,
    /// Length of one delay tick in milliseconds.
    pub tick_ms: u64,
}

impl Default for TasksSection {
    fn default() -> Self {
        Self {
            max_pending: 5000,
            tick_ms: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// EventsSection
// ---------------------------------------------------------------------------

/// Device event queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    /// Events a device can hold before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["ember_vfs=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
