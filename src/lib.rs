//! Caravan: a declarative, resumable deployment engine for graphs of
//! on-chain actions.
//!
//! A deployment is declared as a [`Module`]: a named, acyclic collection of
//! futures (contract deployments, calls, static calls, raw sends, address
//! bindings, event reads) whose arguments may reference other futures'
//! eventual results. The [`Deployer`] turns the graph into concurrent
//! batches, drives every network interaction through retries, fee bumps and
//! timeouts, journals each step so a run can resume after a crash, and
//! reconciles resumed runs against edited modules.

pub use caravan_abi::{resolve_constructor, resolve_function, ResolveError};
pub use caravan_chain::{
    link_bytecode, ArtifactSource, ChainClient, ChainError, InMemoryArtifacts,
    InteractionOutcome, NonceManager, PollResult, SupervisorPolicy, TransactionRequest,
};
pub use caravan_config::{ConfigLoader, DeployConfig, SupervisorConfig};
pub use caravan_graph::{compute_batches, BatchPlan, GraphError, Module, ModuleBuilder};
pub use caravan_journal::{
    DeploymentSnapshot, FileJournal, InMemoryJournal, Journal, JournalError, JournalRecord,
};
pub use caravan_orchestrator::{
    event_channel, Deployer, DeployerBuilder, DeployError, MpscEventSink, StopHandle,
};
pub use caravan_types::{
    AbiEntry, AbiEntryKind, AbiParam, Argument, Artifact, BlockedRef, DeploymentEvent,
    DeploymentResult, EventLog, EventSink, ExecutionErrorResult, ExecutionState, ExecutionStatus,
    FailureRef, FeeSnapshot, Future, FutureKind, FutureResult, InteractionRef, InteractionStatus,
    NetworkInteraction, NoopEventSink, Receipt, Value,
};

use std::time::Duration;

/// Turn configured supervisor knobs into the runtime policy the
/// interaction supervisor runs on.
pub fn supervisor_policy(config: &SupervisorConfig) -> SupervisorPolicy {
    SupervisorPolicy {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        stall_threshold: Duration::from_millis(config.stall_threshold_ms),
        max_drop_resends: config.max_drop_resends,
        interaction_timeout: Duration::from_millis(config.interaction_timeout_ms),
        fee_bump_percent: config.fee_bump_percent,
    }
}
