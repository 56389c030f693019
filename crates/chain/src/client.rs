use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use caravan_types::{FeeSnapshot, Receipt, Value};

use crate::ChainError;

/// A fully resolved transaction, ready to sign and broadcast. Argument
/// encoding is the client's concern; nothing symbolic survives to here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tx", rename_all = "snake_case")]
pub enum TransactionRequest {
    Deploy {
        /// Linked bytecode, 0x-prefixed hex.
        bytecode: String,
        args: Vec<Value>,
        value: u128,
    },

    Call {
        to: String,
        /// Canonical function signature, e.g. `transfer(address,uint256)`.
        function: String,
        args: Vec<Value>,
        value: u128,
    },

    Send {
        to: String,
        /// Raw calldata, 0x-prefixed hex.
        data: String,
        value: u128,
    },
}

/// Observed status of a submitted transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Pending,

    Confirmed(Receipt),

    /// The hash disappeared from the pending pool without confirming.
    Dropped,

    /// The nonce was consumed by a different transaction hash.
    Replaced { by: String },
}

/// The underlying network boundary. Implementations sign and broadcast;
/// no retry, backoff, or fee-bump logic lives here, that is entirely the
/// interaction supervisor's responsibility.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Sign and broadcast, returning the transaction hash.
    async fn submit(
        &self,
        request: &TransactionRequest,
        nonce: u64,
        fees: FeeSnapshot,
    ) -> Result<String, ChainError>;

    async fn poll(&self, tx_hash: &str) -> Result<PollResult, ChainError>;

    async fn estimate_fees(&self) -> Result<FeeSnapshot, ChainError>;

    /// Execute a read-only call and decode its return data.
    async fn call(&self, to: &str, function: &str, args: &[Value]) -> Result<Value, ChainError>;

    /// Next unused nonce for the account, including pending transactions.
    async fn pending_nonce(&self, account: &str) -> Result<u64, ChainError>;
}
