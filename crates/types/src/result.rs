use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::FutureResult;

/// Reference to one network interaction of one future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRef {
    pub future_id: String,
    pub interaction_id: u64,
}

/// A failed interaction plus its captured reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRef {
    pub future_id: String,
    pub interaction_id: u64,
    pub error: String,
}

/// A future never scheduled because a dependency did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedRef {
    pub future_id: String,
    /// The failed or timed-out dependency that blocked it.
    pub blocked_by: String,
}

/// Per-future terminal accounting of a run that did not fully succeed.
/// The lists are disjoint: a future appears in exactly one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionErrorResult {
    /// Began executing but reached no terminal state (e.g. the run was
    /// stopped cooperatively).
    pub started: Vec<InteractionRef>,

    pub timed_out: Vec<InteractionRef>,

    pub failed: Vec<FailureRef>,

    pub successful: Vec<String>,

    pub blocked: Vec<BlockedRef>,
}

/// Terminal result of a whole deployment run. Produced once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeploymentResult {
    /// Every future reached SUCCESS.
    Success {
        results: BTreeMap<String, FutureResult>,
    },

    /// Rejected before any network interaction.
    ValidationError {
        errors: BTreeMap<String, Vec<String>>,
    },

    /// Stored state conflicts with the freshly loaded module.
    ReconciliationError {
        errors: BTreeMap<String, Vec<String>>,
    },

    ExecutionError(ExecutionErrorResult),
}

impl DeploymentResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentResult::Success { .. })
    }

    /// Human-readable rendering of a non-success result, suitable for
    /// surfacing as an error message to the operator.
    pub fn to_error_message(&self) -> Option<String> {
        match self {
            DeploymentResult::Success { .. } => None,
            DeploymentResult::ValidationError { errors } => Some(format!(
                "The deployment wasn't run because of the following validation errors:\n\n{}",
                render_error_map(errors)
            )),
            DeploymentResult::ReconciliationError { errors } => Some(format!(
                "The deployment wasn't run because of the following reconciliation errors:\n\n{}",
                render_error_map(errors)
            )),
            DeploymentResult::ExecutionError(details) => Some(render_execution_error(details)),
        }
    }
}

fn render_error_map(errors: &BTreeMap<String, Vec<String>>) -> String {
    let lines: Vec<String> = errors
        .iter()
        .flat_map(|(future_id, messages)| {
            messages
                .iter()
                .map(move |m| format!("  * {}: {}", future_id, m))
        })
        .collect();
    lines.join("\n")
}

fn render_execution_error(details: &ExecutionErrorResult) -> String {
    let mut sections = Vec::new();

    if !details.timed_out.is_empty() {
        let lines: Vec<String> = details
            .timed_out
            .iter()
            .map(|r| format!("  * {}/{}", r.future_id, r.interaction_id))
            .collect();
        sections.push(format!("Timed out:\n\n{}", lines.join("\n")));
    }

    if !details.failed.is_empty() {
        let lines: Vec<String> = details
            .failed
            .iter()
            .map(|r| format!("  * {}/{}: {}", r.future_id, r.interaction_id, r.error))
            .collect();
        sections.push(format!("Failures:\n\n{}", lines.join("\n")));
    }

    if !details.blocked.is_empty() {
        let lines: Vec<String> = details
            .blocked
            .iter()
            .map(|r| format!("  * {} (blocked by {})", r.future_id, r.blocked_by))
            .collect();
        sections.push(format!("Blocked:\n\n{}", lines.join("\n")));
    }

    let headline = match (details.timed_out.is_empty(), details.failed.is_empty()) {
        (false, false) => "The deployment wasn't successful, there were timeouts and failures:",
        (false, true) => "The deployment wasn't successful, there were timeouts:",
        _ => "The deployment wasn't successful, there were failures:",
    };

    format!("{}\n\n{}", headline, sections.join("\n\n"))
}
