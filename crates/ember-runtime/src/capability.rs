//! Host capabilities and the adapter that attaches them to a device.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ember_core::Value;
use tracing::trace;

use crate::bridge::ScriptContext;
use crate::error::{RuntimeError, RuntimeResult};

/// A host object exposed to scripts, with lifecycle hooks and indexed
/// methods.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Method names, in dispatch index order.
    fn method_names(&self) -> Vec<String>;

    /// Called when the device starts.
    fn startup(&self) {}

    /// Called once per device tick.
    fn advance(&self, _dt: Duration) {}

    /// Called when the device shuts down.
    fn shutdown(&self) {}

    /// Invoke the method at `method`.
    ///
    /// `ctx` is the calling script's context; capabilities that block on
    /// host work use it with the task bridge.
    async fn call_method(
        &self,
        ctx: &mut dyn ScriptContext,
        method: usize,
        args: Vec<Value>,
    ) -> RuntimeResult<Vec<Value>>;

    /// Per-method yield information, for capabilities that provide it.
    fn as_method_descriptor(&self) -> Option<&dyn MethodDescriptor> {
        None
    }
}

/// Optional capability extension: whether a method may suspend its caller.
pub trait MethodDescriptor {
    /// Whether calling `method` may yield.
    fn may_yield(&self, method: usize) -> bool;
}

/// Wraps a [`Capability`] in the shape the device loop drives.
pub struct ApiAdapter {
    names: Vec<String>,
    capability: Arc<dyn Capability>,
}

impl ApiAdapter {
    /// Wrap `capability`, published under the global `names`.
    #[must_use]
    pub fn new(names: Vec<String>, capability: Arc<dyn Capability>) -> Self {
        Self { names, capability }
    }

    /// Globals this capability is published under.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The wrapped capability.
    #[must_use]
    pub fn capability(&self) -> &Arc<dyn Capability> {
        &self.capability
    }

    /// Method names, in dispatch index order.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        self.capability.method_names()
    }

    /// Forward device start-up.
    pub fn startup(&self) {
        self.capability.startup();
    }

    /// Forward a device tick.
    pub fn advance(&self, dt: Duration) {
        self.capability.advance(dt);
    }

    /// Forward device shutdown.
    pub fn shutdown(&self) {
        self.capability.shutdown();
    }

    /// Dispatch a method call.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Script`] for an index outside the method
    /// table, otherwise whatever the capability returns.
    pub async fn call_method(
        &self,
        ctx: &mut dyn ScriptContext,
        method: usize,
        args: Vec<Value>,
    ) -> RuntimeResult<Vec<Value>> {
        let count = self.capability.method_names().len();
        if method >= count {
            return Err(RuntimeError::Script(format!(
                "No such method {method} (have {count})"
            )));
        }
        trace!(api = ?self.names, method, "Calling capability method");
        self.capability.call_method(ctx, method, args).await
    }

    /// Whether calling `method` may suspend the caller.
    ///
    /// Capabilities without a [`MethodDescriptor`] are assumed to yield.
    #[must_use]
    pub fn may_yield(&self, method: usize) -> bool {
        self.capability
            .as_method_descriptor()
            .is_none_or(|descriptor| descriptor.may_yield(method))
    }
}

impl std::fmt::Debug for ApiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiAdapter")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
