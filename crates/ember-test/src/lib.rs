//! Ember Test - Shared test utilities for the Ember device host.
//!
//! Mock capabilities, runtime backends and filesystems, plus fixtures that
//! wire them into a device the way the host does.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! ember-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use ember_test::{test_device_access, test_registry, test_task_bridge};
//!
//! #[tokio::test]
//! async fn test_bring_up() {
//!     let bridge = test_task_bridge();
//!     let (access, stream) = test_device_access(1, &bridge);
//!     let registry = test_registry(&["safe"]);
//!     // ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
