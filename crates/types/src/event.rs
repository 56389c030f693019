use serde::{Deserialize, Serialize};

use crate::ExecutionStatus;

/// Ordered lifecycle events emitted while a deployment runs.
///
/// Subscribers (UI, logging) receive these fire-and-forget: emission never
/// blocks or fails the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeploymentEvent {
    RunStarted {
        module_id: String,
    },

    BatchStarted {
        batch_index: usize,
        futures: Vec<String>,
    },

    FutureStarted {
        future_id: String,
    },

    FutureCompleted {
        future_id: String,
        status: ExecutionStatus,
    },

    TransactionSent {
        future_id: String,
        interaction_id: u64,
        tx_hash: String,
        fees: FeeSnapshot,
    },

    TransactionConfirmed {
        future_id: String,
        interaction_id: u64,
        tx_hash: String,
    },

    FeeBumped {
        future_id: String,
        interaction_id: u64,
        tx_hash: String,
        fees: FeeSnapshot,
    },

    TransactionDropped {
        future_id: String,
        interaction_id: u64,
    },

    ReplacedByUser {
        future_id: String,
        interaction_id: u64,
        replacing_hash: String,
    },

    InteractionTimedOut {
        future_id: String,
        interaction_id: u64,
    },

    FutureWiped {
        future_id: String,
    },

    RunCompleted {
        module_id: String,
        success: bool,
    },
}

/// Fee parameters as emitted in events and recorded per send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSnapshot {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Injected sink for lifecycle events. Exactly one writer (the run) and
/// arbitrarily many readers behind the implementation.
pub trait EventSink: Send + Sync {
    /// Must not block and must not fail the caller.
    fn emit(&self, event: DeploymentEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: DeploymentEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_roundtrip() {
        let event = DeploymentEvent::TransactionSent {
            future_id: "f1".to_string(),
            interaction_id: 1,
            tx_hash: "0xabc".to_string(),
            fees: FeeSnapshot {
                max_fee_per_gas: 100,
                max_priority_fee_per_gas: 2,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: DeploymentEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_noop_sink_accepts_events() {
        let sink = NoopEventSink;
        sink.emit(DeploymentEvent::RunStarted {
            module_id: "m".to_string(),
        });
    }
}
