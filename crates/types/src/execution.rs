use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AbiEntry, Value};

/// Lifecycle status of a single future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Unstarted,
    Ready,
    Executing,
    Success,
    Failed,
    TimedOut,
}

impl ExecutionStatus {
    /// Terminal states never transition again (absent an explicit wipe).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Failed | ExecutionStatus::TimedOut
        )
    }
}

/// Status of one on-chain submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Pending,
    Confirmed,
    Dropped,
    /// The nonce was consumed by a transaction this run never sent.
    ReplacedByUser,
    TimedOut,
}

/// A decoded log emitted by a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub name: String,
    pub args: BTreeMap<String, Value>,
}

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// True when the transaction executed without reverting.
    pub success: bool,

    /// Address created by a deployment transaction.
    pub contract_address: Option<String>,

    pub logs: Vec<EventLog>,

    /// Revert reason captured from a failed execution.
    pub revert_reason: Option<String>,
}

/// One on-chain submission: a nonce plus every transaction hash sent for it
/// (first send and any fee-bump or drop resends). Append-only; owned
/// exclusively by its future's [`ExecutionState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInteraction {
    /// Ordinal within the owning future, starting at 1.
    pub id: u64,

    pub nonce: u64,

    /// Every hash submitted for this nonce, in send order.
    pub tx_hashes: Vec<String>,

    pub status: InteractionStatus,

    /// Present once confirmed.
    pub receipt: Option<Receipt>,
}

impl NetworkInteraction {
    pub fn new(id: u64, nonce: u64) -> Self {
        Self {
            id,
            nonce,
            tx_hashes: Vec::new(),
            status: InteractionStatus::Pending,
            receipt: None,
        }
    }
}

/// The resolved outcome of a successful future, consumable by dependents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FutureResult {
    /// A deployed or bound contract.
    Contract {
        contract_name: String,
        address: String,
        abi: Vec<AbiEntry>,
        bytecode: String,
    },

    /// A mutating call or raw send that confirmed on-chain.
    TxExecuted { tx_hash: String },

    /// Data returned by a static call.
    Data(Value),

    /// A value read out of a receipt log.
    EventArg(Value),
}

impl FutureResult {
    /// Coerce to the value form dependents consume as an argument.
    /// Contract-typed results coerce to their address.
    pub fn to_value(&self) -> Value {
        match self {
            FutureResult::Contract { address, .. } => Value::Address(address.clone()),
            FutureResult::TxExecuted { tx_hash } => Value::Bytes(tx_hash.clone()),
            FutureResult::Data(value) | FutureResult::EventArg(value) => value.clone(),
        }
    }
}

/// Everything recorded about one future's execution. Created when the future
/// first becomes reachable; mutated only by the executor owning that future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub future_id: String,

    pub status: ExecutionStatus,

    pub interactions: Vec<NetworkInteraction>,

    /// Canonical JSON of the fully resolved inputs, recorded when execution
    /// starts. Reconciliation compares these, never symbolic references.
    pub resolved_inputs: Option<serde_json::Value>,

    /// Present once status is Success.
    pub result: Option<FutureResult>,

    /// Failure reason (revert reason, resolution error, replacement notice).
    pub error: Option<String>,

    /// Unix seconds of the last journal record applied.
    pub updated_at: u64,
}

impl ExecutionState {
    pub fn new(future_id: impl Into<String>) -> Self {
        Self {
            future_id: future_id.into(),
            status: ExecutionStatus::Unstarted,
            interactions: Vec::new(),
            resolved_inputs: None,
            result: None,
            error: None,
            updated_at: 0,
        }
    }

    /// The interaction currently being driven, if any.
    pub fn last_interaction_mut(&mut self) -> Option<&mut NetworkInteraction> {
        self.interactions.last_mut()
    }

    /// Receipt of the last confirmed interaction, if any.
    pub fn confirmed_receipt(&self) -> Option<&Receipt> {
        self.interactions
            .iter()
            .rev()
            .find(|i| i.status == InteractionStatus::Confirmed)
            .and_then(|i| i.receipt.as_ref())
    }
}

/// Digest of canonical resolved inputs, used for reconciliation equality.
pub fn inputs_digest(inputs: &serde_json::Value) -> String {
    let canonical = inputs.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
