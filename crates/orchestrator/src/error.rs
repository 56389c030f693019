use thiserror::Error;

use caravan_chain::ChainError;
use caravan_journal::JournalError;

/// Infrastructure failures that abort a run outright.
///
/// Semantic failures (reverts, timeouts, validation, reconciliation) never
/// surface here; they are carried inside the `DeploymentResult`.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("journal failure: {0}")]
    Journal(#[from] JournalError),

    #[error("state store failure: {reason}")]
    Store { reason: String },
}

impl From<ChainError> for DeployError {
    fn from(e: ChainError) -> Self {
        DeployError::Store {
            reason: e.to_string(),
        }
    }
}
