//! Bridge from `ember_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates; the
//! conversions into runtime, task and logging settings happen here, once.

use std::time::Duration;

use ember_config::Config;
use ember_telemetry::LogConfig;

use crate::machine::MachineSettings;
use crate::task::TaskConfig;

/// Convert config to [`TaskConfig`].
#[must_use]
pub fn to_task_config(cfg: &Config) -> TaskConfig {
    TaskConfig::new(
        cfg.tasks.max_pending,
        Duration::from_millis(cfg.tasks.tick_ms),
    )
}

/// Convert config to [`MachineSettings`].
#[must_use]
pub fn to_machine_settings(cfg: &Config) -> MachineSettings {
    MachineSettings {
        runtime_id: cfg.runtime.id.clone(),
        default_runtime_id: cfg.runtime.default_id.clone(),
        host: cfg.runtime.host.clone(),
        default_settings: cfg.runtime.default_settings.clone(),
        disable_legacy_features: cfg.runtime.disable_legacy_features,
    }
}

/// Capacity of each device's event queue.
#[must_use]
pub fn event_queue_capacity(cfg: &Config) -> usize {
    cfg.events.queue_capacity
}

/// Convert the `[logging]` section to a [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    LogConfig::from(&cfg.logging)
}
