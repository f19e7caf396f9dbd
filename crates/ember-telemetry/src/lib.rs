//! Ember Telemetry - Logging setup for the Ember device host.
//!
//! # Example
//!
//! ```rust,no_run
//! use ember_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), ember_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("ember_vfs=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("Device host starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
