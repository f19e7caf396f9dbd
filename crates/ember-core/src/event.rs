//! Device events.

use serde::{Deserialize, Serialize};

use crate::Value;

/// A named event delivered to a device's guest script.
///
/// Scripts observe an event as the tuple `(name, args...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    args: Vec<Value>,
}

impl Event {
    /// Create a new event.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The event arguments, not including the name.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Consume the event, returning its arguments.
    #[must_use]
    pub fn into_args(self) -> Vec<Value> {
        self.args
    }

    /// Whether this event has the given name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = Event::new("timer", vec![Value::from(4)]);
        assert!(event.is("timer"));
        assert!(!event.is("alarm"));
        assert_eq!(event.args(), &[Value::Integer(4)]);
        assert_eq!(event.into_args(), vec![Value::Integer(4)]);
    }
}
