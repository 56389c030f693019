use std::collections::HashMap;

use async_trait::async_trait;

use caravan_types::{ExecutionState, ExecutionStatus};

use crate::{JournalError, JournalRecord};

/// Reconstructed view of a prior (or in-progress) run: one
/// [`ExecutionState`] per future that ever produced a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentSnapshot {
    pub module_id: String,
    pub states: HashMap<String, ExecutionState>,
}

impl DeploymentSnapshot {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            states: HashMap::new(),
        }
    }

    pub fn state(&self, future_id: &str) -> Option<&ExecutionState> {
        self.states.get(future_id)
    }

    pub fn status(&self, future_id: &str) -> ExecutionStatus {
        self.states
            .get(future_id)
            .map(|s| s.status)
            .unwrap_or(ExecutionStatus::Unstarted)
    }

    /// Status view keyed by future id, as consumed by the batcher.
    pub fn statuses(&self) -> HashMap<String, ExecutionStatus> {
        self.states
            .iter()
            .map(|(id, state)| (id.clone(), state.status))
            .collect()
    }
}

/// The single source of truth for what has executed.
///
/// Keyed by module id, append-only per future id. Implementations must
/// survive process restarts and tolerate a torn trailing write: a crash
/// mid-append must not corrupt other futures' records.
#[async_trait]
pub trait Journal: Send + Sync {
    /// Replay every stored record for the module into a snapshot.
    async fn load(&self, module_id: &str) -> Result<DeploymentSnapshot, JournalError>;

    /// Append one record for one future. Durable on return.
    async fn append(
        &self,
        module_id: &str,
        future_id: &str,
        record: JournalRecord,
    ) -> Result<(), JournalError>;

    /// Reset one future to UNSTARTED so it is entirely re-run next time.
    async fn wipe(&self, module_id: &str, future_id: &str) -> Result<(), JournalError> {
        self.append(module_id, future_id, JournalRecord::FutureWiped)
            .await
    }
}
