//! Core configuration structures for the Caravan deployment engine

use serde::{Deserialize, Serialize};

/// Main deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfig {
    /// Target network configuration
    pub network: NetworkConfig,

    /// Interaction supervision policy
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Journal storage configuration
    #[serde(default)]
    pub journal: JournalConfig,
}

/// Target network configuration. One network per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain identifier (e.g. "1", "11155111")
    pub chain_id: String,

    /// RPC endpoint URL
    pub rpc_url: String,

    /// Sending account address
    pub account: String,

    /// Minimum confirmations before a transaction counts as confirmed
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: "31337".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            account: String::new(),
            min_confirmations: default_min_confirmations(),
        }
    }
}

/// Retry/timeout/fee-bump policy for network interactions.
///
/// These are the knobs the interaction supervisor runs on; nothing numeric
/// is hard-coded in the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Confirmation polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Unconfirmed time before a fee bump, in milliseconds
    #[serde(default = "default_stall_threshold_ms")]
    pub stall_threshold_ms: u64,

    /// Resubmissions allowed for a dropped transaction
    #[serde(default = "default_max_drop_resends")]
    pub max_drop_resends: u32,

    /// Absolute per-interaction budget in milliseconds
    #[serde(default = "default_interaction_timeout_ms")]
    pub interaction_timeout_ms: u64,

    /// Fee increase per resend, in percent
    #[serde(default = "default_fee_bump_percent")]
    pub fee_bump_percent: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stall_threshold_ms: default_stall_threshold_ms(),
            max_drop_resends: default_max_drop_resends(),
            interaction_timeout_ms: default_interaction_timeout_ms(),
            fee_bump_percent: default_fee_bump_percent(),
        }
    }
}

/// Journal storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Directory holding per-module journal files
    #[serde(default = "default_journal_dir")]
    pub dir: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: default_journal_dir(),
        }
    }
}

fn default_min_confirmations() -> u32 {
    1
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_stall_threshold_ms() -> u64 {
    30_000
}

fn default_max_drop_resends() -> u32 {
    3
}

fn default_interaction_timeout_ms() -> u64 {
    300_000
}

fn default_fee_bump_percent() -> u64 {
    12
}

fn default_journal_dir() -> String {
    "deployments".to_string()
}
