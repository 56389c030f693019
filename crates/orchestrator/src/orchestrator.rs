use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use caravan_chain::{ArtifactSource, ChainClient, NonceManager, SupervisorPolicy};
use caravan_graph::{compute_batches, Module};
use caravan_journal::Journal;
use caravan_types::{
    DeploymentEvent, DeploymentResult, EventSink, ExecutionErrorResult, ExecutionState,
    ExecutionStatus, FailureRef, FutureResult, InteractionRef, NoopEventSink,
};

use crate::executor::{execute_future, ExecutionContext, FutureOutcome};
use crate::reconcile::reconcile;
use crate::validate::validate_module;
use crate::{BuilderError, DeployError};

/// Cooperative stop signal for a running deployment.
///
/// Requesting a stop lets every in-flight interaction reach a terminal
/// state; no further batch is started. An unconfirmed submitted transaction
/// is never abandoned mid-flight.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Builder for [`Deployer`]
pub struct DeployerBuilder {
    artifacts: Option<Arc<dyn ArtifactSource>>,
    client: Option<Arc<dyn ChainClient>>,
    journal: Option<Arc<dyn Journal>>,
    events: Arc<dyn EventSink>,
    policy: SupervisorPolicy,
    account: Option<String>,
}

impl DeployerBuilder {
    pub fn new() -> Self {
        Self {
            artifacts: None,
            client: None,
            journal: None,
            events: Arc::new(NoopEventSink),
            policy: SupervisorPolicy::default(),
            account: None,
        }
    }

    pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactSource>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn with_client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_journal(mut self, journal: Arc<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_policy(mut self, policy: SupervisorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the sending account address
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Build the Deployer, validating that all required fields are set
    pub fn build(self) -> Result<Deployer, BuilderError> {
        let artifacts = self.artifacts.ok_or_else(|| BuilderError::MissingField {
            field: "artifacts".to_string(),
        })?;
        let client = self.client.ok_or_else(|| BuilderError::MissingField {
            field: "client".to_string(),
        })?;
        let journal = self.journal.ok_or_else(|| BuilderError::MissingField {
            field: "journal".to_string(),
        })?;
        let account = self.account.ok_or_else(|| BuilderError::MissingField {
            field: "account".to_string(),
        })?;

        Ok(Deployer {
            artifacts,
            client,
            journal,
            events: self.events,
            policy: self.policy,
            account,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl Default for DeployerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level deployment orchestrator.
///
/// Drives the loop: validate, reconcile, batch, fan out executors, await
/// terminal states, aggregate into a single [`DeploymentResult`].
pub struct Deployer {
    artifacts: Arc<dyn ArtifactSource>,
    client: Arc<dyn ChainClient>,
    journal: Arc<dyn Journal>,
    events: Arc<dyn EventSink>,
    policy: SupervisorPolicy,
    account: String,
    stop: Arc<AtomicBool>,
}

impl Deployer {
    pub fn builder() -> DeployerBuilder {
        DeployerBuilder::new()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
        }
    }

    /// Reset one future's stored state so it is entirely re-run on the next
    /// run, without discarding the rest of the deployment's history.
    pub async fn wipe(&self, module_id: &str, future_id: &str) -> Result<(), DeployError> {
        self.journal.wipe(module_id, future_id).await?;
        self.events.emit(DeploymentEvent::FutureWiped {
            future_id: future_id.to_string(),
        });
        info!(module_id, future_id, "future wiped");
        Ok(())
    }

    /// Run the module to a terminal [`DeploymentResult`].
    pub async fn run(&self, module: &Module) -> Result<DeploymentResult, DeployError> {
        info!(module_id = %module.id(), futures = module.len(), "deployment run starting");
        self.events.emit(DeploymentEvent::RunStarted {
            module_id: module.id().to_string(),
        });

        // Validation rejects before any network interaction.
        let validation_errors = validate_module(module, self.artifacts.as_ref());
        if !validation_errors.is_empty() {
            warn!(module_id = %module.id(), "validation failed");
            self.finish(module, false);
            return Ok(DeploymentResult::ValidationError {
                errors: validation_errors,
            });
        }

        // Reconciliation rejects before execution resumes.
        let snapshot = self.journal.load(module.id()).await?;
        let report = reconcile(module, &snapshot, self.artifacts.as_ref());
        if report.has_conflicts() {
            warn!(module_id = %module.id(), "reconciliation failed");
            self.finish(module, false);
            return Ok(DeploymentResult::ReconciliationError {
                errors: report.conflicts,
            });
        }

        let mut results: HashMap<String, FutureResult> = report.reusable.clone();
        let mut statuses: HashMap<String, ExecutionStatus> = module
            .future_ids()
            .map(|id| {
                let status = if report.reusable.contains_key(id) {
                    ExecutionStatus::Success
                } else {
                    ExecutionStatus::Unstarted
                };
                (id.to_string(), status)
            })
            .collect();

        // Receipt-bearing states for event reads. Stale entries of futures
        // being re-run are dropped; the journal refreshes them per batch.
        let mut live_states: HashMap<String, ExecutionState> = snapshot.states;
        live_states.retain(|id, _| !report.to_run.contains(id));

        let nonces = NonceManager::new(self.client.clone());
        let mut failure_reasons: HashMap<String, String> = HashMap::new();
        let mut batch_index = 0usize;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                warn!(module_id = %module.id(), "stop requested, halting before next batch");
                break;
            }

            let plan = compute_batches(module, &statuses);
            let Some(batch) = plan.batches.first().cloned() else {
                break;
            };

            info!(batch_index, futures = batch.len(), "starting batch");
            self.events.emit(DeploymentEvent::BatchStarted {
                batch_index,
                futures: batch.clone(),
            });

            let ctx = ExecutionContext {
                module_id: module.id(),
                account: &self.account,
                client: self.client.as_ref(),
                artifacts: self.artifacts.as_ref(),
                journal: self.journal.as_ref(),
                events: self.events.as_ref(),
                nonces: &nonces,
                policy: &self.policy,
            };

            // Fan out: futures within one batch execute concurrently.
            let members: Vec<_> = batch.iter().filter_map(|id| module.get(id)).collect();
            let outcomes = futures::future::join_all(
                members
                    .iter()
                    .map(|future| execute_future(&ctx, future, &results, &live_states)),
            )
            .await;

            for (future, outcome) in members.iter().zip(outcomes) {
                let outcome = outcome?;
                statuses.insert(future.id.clone(), outcome.status());
                match outcome {
                    FutureOutcome::Success(result) => {
                        results.insert(future.id.clone(), result);
                    }
                    FutureOutcome::Failed(reason) => {
                        failure_reasons.insert(future.id.clone(), reason);
                    }
                    FutureOutcome::TimedOut => {}
                }
            }

            // The journal is the source of truth; pull the completed
            // futures' states (receipts included) back from it.
            let refreshed = self.journal.load(module.id()).await?;
            for id in &batch {
                if let Some(state) = refreshed.states.get(id) {
                    live_states.insert(id.clone(), state.clone());
                }
            }

            batch_index += 1;
        }

        let result = self.aggregate(module, &statuses, &results, &failure_reasons, &live_states);
        self.finish(module, result.is_success());
        Ok(result)
    }

    /// Collapse per-future terminal states into the single run result.
    fn aggregate(
        &self,
        module: &Module,
        statuses: &HashMap<String, ExecutionStatus>,
        results: &HashMap<String, FutureResult>,
        failure_reasons: &HashMap<String, String>,
        live_states: &HashMap<String, ExecutionState>,
    ) -> DeploymentResult {
        let plan = compute_batches(module, statuses);
        let blocked_ids: Vec<&str> = plan.blocked.iter().map(|b| b.future_id.as_str()).collect();

        let last_interaction = |id: &str| -> u64 {
            live_states
                .get(id)
                .and_then(|s| s.interactions.last())
                .map(|i| i.id)
                .unwrap_or(0)
        };

        let mut details = ExecutionErrorResult {
            blocked: plan.blocked.clone(),
            ..Default::default()
        };

        for id in module.future_ids() {
            if blocked_ids.contains(&id) {
                continue;
            }
            match statuses.get(id).copied().unwrap_or(ExecutionStatus::Unstarted) {
                ExecutionStatus::Success => details.successful.push(id.to_string()),
                ExecutionStatus::Failed => details.failed.push(FailureRef {
                    future_id: id.to_string(),
                    interaction_id: last_interaction(id),
                    error: failure_reasons
                        .get(id)
                        .cloned()
                        .or_else(|| live_states.get(id).and_then(|s| s.error.clone()))
                        .unwrap_or_else(|| "execution failed".to_string()),
                }),
                ExecutionStatus::TimedOut => details.timed_out.push(InteractionRef {
                    future_id: id.to_string(),
                    interaction_id: last_interaction(id),
                }),
                // Scheduled but never driven to a terminal state, e.g. the
                // run was stopped cooperatively.
                _ => details.started.push(InteractionRef {
                    future_id: id.to_string(),
                    interaction_id: last_interaction(id),
                }),
            }
        }

        let fully_successful = details.successful.len() == module.len();
        if fully_successful {
            let results: BTreeMap<String, FutureResult> = results
                .iter()
                .filter(|(id, _)| module.get(id).is_some())
                .map(|(id, r)| (id.clone(), r.clone()))
                .collect();
            DeploymentResult::Success { results }
        } else {
            DeploymentResult::ExecutionError(details)
        }
    }

    fn finish(&self, module: &Module, success: bool) {
        info!(module_id = %module.id(), success, "deployment run finished");
        self.events.emit(DeploymentEvent::RunCompleted {
            module_id: module.id().to_string(),
            success,
        });
    }
}
