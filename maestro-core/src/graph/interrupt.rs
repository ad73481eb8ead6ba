//! Human-in-the-loop interrupts: a node can pause a run pending external approval.

use async_trait::async_trait;
use serde_json::Value;

/// A pause request raised by a node (e.g. `ActNode` before a destructive tool call).
#[derive(Debug, Clone)]
pub struct Interrupt {
    /// Stable event type string clients use to render the right approval UI.
    pub event_type: String,
    /// Arbitrary payload describing what needs approval (tool name, arguments, ...).
    pub payload: Value,
}

impl Interrupt {
    /// Builds an interrupt with the given event type and payload.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Error-like signal that a run paused on an `Interrupt` instead of completing normally.
#[derive(Debug, Clone)]
pub struct GraphInterrupt {
    /// The interrupt that paused the run.
    pub interrupt: Interrupt,
    /// Id of the node that raised it, for resuming at the right point.
    pub node_id: String,
}

/// Decision returned by an `InterruptHandler` for a raised `Interrupt`.
#[derive(Debug, Clone, PartialEq)]
pub enum InterruptResolution {
    /// Proceed as if the action had been approved.
    Approved,
    /// Reject the action; the node should treat this as a denial, not an error.
    Denied,
}

/// Resolves interrupts raised during a run.
///
/// Implementations decide synchronously (e.g. a policy lookup) or asynchronously
/// (e.g. waiting on a human response) whether an interrupted action proceeds.
#[async_trait]
pub trait InterruptHandler: Send + Sync {
    /// Resolves the given interrupt.
    async fn resolve(&self, interrupt: &Interrupt) -> InterruptResolution;
}

/// Default handler: always denies, so unattended runs fail closed rather than
/// silently approving destructive actions.
pub struct DefaultInterruptHandler;

#[async_trait]
impl InterruptHandler for DefaultInterruptHandler {
    async fn resolve(&self, _interrupt: &Interrupt) -> InterruptResolution {
        InterruptResolution::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: the default handler denies every interrupt (fail closed).
    #[tokio::test]
    async fn default_handler_denies() {
        let handler = DefaultInterruptHandler;
        let interrupt = Interrupt::new("approval_required", serde_json::json!({"tool": "bash"}));
        assert_eq!(handler.resolve(&interrupt).await, InterruptResolution::Denied);
    }
}
