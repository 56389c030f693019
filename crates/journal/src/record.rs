use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use caravan_types::{
    ExecutionState, ExecutionStatus, FutureResult, InteractionStatus, NetworkInteraction, Receipt,
    JOURNAL_VERSION,
};

/// One appended delta in a future's lifecycle. Replaying a future's records
/// in order reconstructs its exact [`ExecutionState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum JournalRecord {
    /// Execution began with these fully resolved inputs. Also marks the
    /// start of a fresh attempt after a wipe: replay resets prior
    /// interactions.
    FutureStarted { resolved_inputs: serde_json::Value },

    InteractionOpened { interaction_id: u64, nonce: u64 },

    /// A transaction was submitted for the interaction (first send or any
    /// fee-bump/drop resend).
    TransactionSent { interaction_id: u64, tx_hash: String },

    InteractionConfirmed {
        interaction_id: u64,
        receipt: Receipt,
    },

    InteractionDropped { interaction_id: u64 },

    InteractionReplaced {
        interaction_id: u64,
        replacing_hash: String,
    },

    InteractionTimedOut { interaction_id: u64 },

    FutureSucceeded { result: FutureResult },

    FutureFailed { reason: String },

    FutureTimedOut,

    /// Explicit reset to UNSTARTED so the future is entirely re-run.
    FutureWiped,
}

/// The durable wire form: one line per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub version: String,
    pub future_id: String,
    /// Unix seconds at append time.
    pub at: u64,
    #[serde(flatten)]
    pub record: JournalRecord,
}

impl JournalLine {
    pub fn new(future_id: impl Into<String>, at: u64, record: JournalRecord) -> Self {
        Self {
            version: JOURNAL_VERSION.to_string(),
            future_id: future_id.into(),
            at,
            record,
        }
    }
}

/// Replay an ordered sequence of lines into per-future execution states.
pub fn replay(lines: &[JournalLine]) -> HashMap<String, ExecutionState> {
    let mut states: HashMap<String, ExecutionState> = HashMap::new();

    for line in lines {
        let state = states
            .entry(line.future_id.clone())
            .or_insert_with(|| ExecutionState::new(line.future_id.clone()));
        state.updated_at = line.at;
        apply(state, &line.record);
    }

    states
}

fn apply(state: &mut ExecutionState, record: &JournalRecord) {
    match record {
        JournalRecord::FutureStarted { resolved_inputs } => {
            // A fresh attempt: drop anything from a prior (wiped) run.
            state.interactions.clear();
            state.result = None;
            state.error = None;
            state.status = ExecutionStatus::Executing;
            state.resolved_inputs = Some(resolved_inputs.clone());
        }
        JournalRecord::InteractionOpened {
            interaction_id,
            nonce,
        } => {
            state
                .interactions
                .push(NetworkInteraction::new(*interaction_id, *nonce));
        }
        JournalRecord::TransactionSent {
            interaction_id,
            tx_hash,
        } => {
            if let Some(interaction) = interaction_mut(state, *interaction_id) {
                interaction.tx_hashes.push(tx_hash.clone());
                interaction.status = InteractionStatus::Pending;
            }
        }
        JournalRecord::InteractionConfirmed {
            interaction_id,
            receipt,
        } => {
            if let Some(interaction) = interaction_mut(state, *interaction_id) {
                interaction.status = InteractionStatus::Confirmed;
                interaction.receipt = Some(receipt.clone());
            }
        }
        JournalRecord::InteractionDropped { interaction_id } => {
            if let Some(interaction) = interaction_mut(state, *interaction_id) {
                interaction.status = InteractionStatus::Dropped;
            }
        }
        JournalRecord::InteractionReplaced {
            interaction_id,
            replacing_hash,
        } => {
            if let Some(interaction) = interaction_mut(state, *interaction_id) {
                interaction.status = InteractionStatus::ReplacedByUser;
            }
            state.error = Some(format!(
                "nonce was consumed by a transaction not sent by this run: {replacing_hash}"
            ));
        }
        JournalRecord::InteractionTimedOut { interaction_id } => {
            if let Some(interaction) = interaction_mut(state, *interaction_id) {
                interaction.status = InteractionStatus::TimedOut;
            }
        }
        JournalRecord::FutureSucceeded { result } => {
            state.status = ExecutionStatus::Success;
            state.result = Some(result.clone());
        }
        JournalRecord::FutureFailed { reason } => {
            state.status = ExecutionStatus::Failed;
            state.error = Some(reason.clone());
        }
        JournalRecord::FutureTimedOut => {
            state.status = ExecutionStatus::TimedOut;
        }
        JournalRecord::FutureWiped => {
            let fresh = ExecutionState::new(state.future_id.clone());
            let at = state.updated_at;
            *state = fresh;
            state.updated_at = at;
        }
    }
}

fn interaction_mut(state: &mut ExecutionState, id: u64) -> Option<&mut NetworkInteraction> {
    state.interactions.iter_mut().find(|i| i.id == id)
}
