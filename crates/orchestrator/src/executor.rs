use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use caravan_chain::{
    link_bytecode, supervise_interaction, ArtifactSource, ChainClient, ChainError,
    InteractionObserver, NonceManager, ResendKind, SupervisorPolicy, TransactionRequest,
};
use caravan_journal::{Journal, JournalRecord};
use caravan_types::{
    Argument, Artifact, DeploymentEvent, EventSink, ExecutionState, ExecutionStatus, EventLog,
    FeeSnapshot, Future, FutureKind, FutureResult, Receipt, Value,
};

use crate::resolve::{resolve_address, resolve_arguments, resolved_inputs};
use crate::DeployError;

/// Everything an executor needs to drive one future. Shared immutably
/// across a batch; each future's state has exactly one writer.
pub struct ExecutionContext<'a> {
    pub module_id: &'a str,
    pub account: &'a str,
    pub client: &'a dyn ChainClient,
    pub artifacts: &'a dyn ArtifactSource,
    pub journal: &'a dyn Journal,
    pub events: &'a dyn EventSink,
    pub nonces: &'a NonceManager,
    pub policy: &'a SupervisorPolicy,
}

/// Terminal outcome of executing one future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FutureOutcome {
    Success(FutureResult),
    Failed(String),
    TimedOut,
}

impl FutureOutcome {
    pub fn status(&self) -> ExecutionStatus {
        match self {
            FutureOutcome::Success(_) => ExecutionStatus::Success,
            FutureOutcome::Failed(_) => ExecutionStatus::Failed,
            FutureOutcome::TimedOut => ExecutionStatus::TimedOut,
        }
    }
}

/// Drive one future from ready to terminal, journaling every step.
///
/// Failure policy: resolution errors and on-chain reverts mark the future
/// FAILED and are never retried automatically; transient network trouble is
/// retried inside the interaction supervisor only.
pub async fn execute_future(
    ctx: &ExecutionContext<'_>,
    future: &Future,
    results: &HashMap<String, FutureResult>,
    states: &HashMap<String, ExecutionState>,
) -> Result<FutureOutcome, DeployError> {
    ctx.events.emit(DeploymentEvent::FutureStarted {
        future_id: future.id.clone(),
    });
    info!(future_id = %future.id, "executing future");

    let outcome = run_future(ctx, future, results, states).await?;

    let terminal = match &outcome {
        FutureOutcome::Success(result) => JournalRecord::FutureSucceeded {
            result: result.clone(),
        },
        FutureOutcome::Failed(reason) => JournalRecord::FutureFailed {
            reason: reason.clone(),
        },
        FutureOutcome::TimedOut => JournalRecord::FutureTimedOut,
    };
    ctx.journal
        .append(ctx.module_id, &future.id, terminal)
        .await?;

    ctx.events.emit(DeploymentEvent::FutureCompleted {
        future_id: future.id.clone(),
        status: outcome.status(),
    });
    info!(future_id = %future.id, status = ?outcome.status(), "future completed");

    Ok(outcome)
}

async fn run_future(
    ctx: &ExecutionContext<'_>,
    future: &Future,
    results: &HashMap<String, FutureResult>,
    states: &HashMap<String, ExecutionState>,
) -> Result<FutureOutcome, DeployError> {
    let artifact = match load_artifact(ctx, future) {
        Ok(artifact) => artifact,
        Err(reason) => return Ok(FutureOutcome::Failed(reason)),
    };

    let inputs = match resolved_inputs(
        future,
        results,
        artifact.as_ref().map(|a| a.bytecode.as_str()),
    ) {
        Ok(inputs) => inputs,
        Err(reason) => return Ok(FutureOutcome::Failed(reason)),
    };
    ctx.journal
        .append(
            ctx.module_id,
            &future.id,
            JournalRecord::FutureStarted {
                resolved_inputs: inputs,
            },
        )
        .await?;

    match &future.kind {
        FutureKind::ContractDeploy {
            args,
            libraries,
            value,
            ..
        } => {
            let Some(artifact) = artifact else {
                return Ok(FutureOutcome::Failed("artifact is missing".to_string()));
            };
            execute_deploy(ctx, &future.id, artifact, args, libraries, *value, results).await
        }

        FutureKind::ContractCall {
            contract,
            method,
            args,
            value,
        } => {
            let (to, function, call_args) =
                match resolve_call(contract, method, args, results) {
                    Ok(parts) => parts,
                    Err(reason) => return Ok(FutureOutcome::Failed(reason)),
                };
            let request = TransactionRequest::Call {
                to,
                function,
                args: call_args,
                value: *value,
            };
            match run_interaction(ctx, &future.id, 1, &request).await? {
                InteractionResult::Confirmed { receipt, tx_hash } => {
                    Ok(confirmation_outcome(receipt, FutureResult::TxExecuted { tx_hash }))
                }
                other => Ok(other.into_outcome()),
            }
        }

        FutureKind::StaticCall {
            contract,
            method,
            args,
        } => {
            // Read-only: no network interaction record is created.
            let (to, function, call_args) =
                match resolve_call(contract, method, args, results) {
                    Ok(parts) => parts,
                    Err(reason) => return Ok(FutureOutcome::Failed(reason)),
                };
            match ctx.client.call(&to, &function, &call_args).await {
                Ok(data) => Ok(FutureOutcome::Success(FutureResult::Data(data))),
                Err(ChainError::Store { reason }) => Err(DeployError::Store { reason }),
                Err(e) => Ok(FutureOutcome::Failed(e.to_string())),
            }
        }

        FutureKind::SendData { to, data, value } => {
            let to = match resolve_address(to, results) {
                Ok(to) => to,
                Err(reason) => return Ok(FutureOutcome::Failed(reason)),
            };
            let request = TransactionRequest::Send {
                to,
                data: data.clone(),
                value: *value,
            };
            match run_interaction(ctx, &future.id, 1, &request).await? {
                InteractionResult::Confirmed { receipt, tx_hash } => {
                    Ok(confirmation_outcome(receipt, FutureResult::TxExecuted { tx_hash }))
                }
                other => Ok(other.into_outcome()),
            }
        }

        FutureKind::ContractAt { address, .. } => {
            // Pure binding: success is immediate, no network interaction.
            let Some(artifact) = artifact else {
                return Ok(FutureOutcome::Failed("artifact is missing".to_string()));
            };
            match resolve_address(address, results) {
                Ok(address) => Ok(FutureOutcome::Success(FutureResult::Contract {
                    contract_name: artifact.contract_name,
                    address,
                    abi: artifact.abi,
                    bytecode: artifact.bytecode,
                })),
                Err(reason) => Ok(FutureOutcome::Failed(reason)),
            }
        }

        FutureKind::ReadEventArg {
            emitter,
            event,
            argument,
            event_index,
        } => Ok(read_event_arg(states, emitter, event, argument, *event_index)),
    }
}

fn load_artifact(
    ctx: &ExecutionContext<'_>,
    future: &Future,
) -> Result<Option<Artifact>, String> {
    match future.artifact_name() {
        Some(name) => ctx
            .artifacts
            .get_artifact(name)
            .map(Some)
            .map_err(|e| e.to_string()),
        None => Ok(None),
    }
}

async fn execute_deploy(
    ctx: &ExecutionContext<'_>,
    future_id: &str,
    artifact: Artifact,
    args: &[Argument],
    libraries: &BTreeMap<String, Argument>,
    value: u128,
    results: &HashMap<String, FutureResult>,
) -> Result<FutureOutcome, DeployError> {
    let resolved_args = match resolve_arguments(args, results) {
        Ok(args) => args,
        Err(reason) => return Ok(FutureOutcome::Failed(reason)),
    };

    let mut library_addresses = BTreeMap::new();
    for (name, lib) in libraries {
        match resolve_address(lib, results) {
            Ok(address) => {
                library_addresses.insert(name.clone(), address);
            }
            Err(reason) => return Ok(FutureOutcome::Failed(reason)),
        }
    }

    let request = TransactionRequest::Deploy {
        bytecode: link_bytecode(&artifact.bytecode, &library_addresses),
        args: resolved_args,
        value,
    };

    match run_interaction(ctx, future_id, 1, &request).await? {
        InteractionResult::Confirmed { receipt, .. } => {
            if !receipt.success {
                return Ok(FutureOutcome::Failed(revert_reason(&receipt)));
            }
            match receipt.contract_address {
                Some(address) => Ok(FutureOutcome::Success(FutureResult::Contract {
                    contract_name: artifact.contract_name,
                    address,
                    abi: artifact.abi,
                    bytecode: artifact.bytecode,
                })),
                None => Ok(FutureOutcome::Failed(
                    "deployment receipt carries no contract address".to_string(),
                )),
            }
        }
        other => Ok(other.into_outcome()),
    }
}

/// Resolve a call target to `(address, canonical signature, arguments)`.
///
/// When the target is a contract-producing future, the method reference is
/// resolved against the bound interface; a literal address target passes
/// the reference through for the client to interpret.
fn resolve_call(
    contract: &Argument,
    method: &str,
    args: &[Argument],
    results: &HashMap<String, FutureResult>,
) -> Result<(String, String, Vec<Value>), String> {
    let to = resolve_address(contract, results)?;
    let call_args = resolve_arguments(args, results)?;

    let function = match contract {
        Argument::Future(id) => match results.get(id) {
            Some(FutureResult::Contract {
                contract_name, abi, ..
            }) => {
                let interface = Artifact {
                    contract_name: contract_name.clone(),
                    abi: abi.clone(),
                    bytecode: String::new(),
                };
                caravan_abi::resolve_function(&interface, method, call_args.len())
                    .map(|entry| entry.signature())
                    .map_err(|e| e.to_string())?
            }
            _ => method.to_string(),
        },
        _ => method.to_string(),
    };

    Ok((to, function, call_args))
}

fn read_event_arg(
    states: &HashMap<String, ExecutionState>,
    emitter: &str,
    event: &str,
    argument: &str,
    event_index: usize,
) -> FutureOutcome {
    let receipt = match states.get(emitter).and_then(ExecutionState::confirmed_receipt) {
        Some(receipt) => receipt,
        None => {
            return FutureOutcome::Failed(format!(
                "future {emitter} has no confirmed transaction to read events from"
            ))
        }
    };

    let log: Option<&EventLog> = receipt
        .logs
        .iter()
        .filter(|l| l.name == event)
        .nth(event_index);

    match log {
        Some(log) => match log.args.get(argument) {
            Some(value) => FutureOutcome::Success(FutureResult::EventArg(value.clone())),
            None => FutureOutcome::Failed(format!(
                "event {event} emitted by {emitter} has no argument {argument}"
            )),
        },
        None => FutureOutcome::Failed(format!(
            "event {event} (occurrence {event_index}) not found in receipt of {emitter}"
        )),
    }
}

fn confirmation_outcome(receipt: Receipt, result: FutureResult) -> FutureOutcome {
    if receipt.success {
        FutureOutcome::Success(result)
    } else {
        FutureOutcome::Failed(revert_reason(&receipt))
    }
}

fn revert_reason(receipt: &Receipt) -> String {
    receipt
        .revert_reason
        .clone()
        .unwrap_or_else(|| "transaction reverted".to_string())
}

/// Terminal result of one supervised interaction, with the winning hash.
enum InteractionResult {
    Confirmed { receipt: Receipt, tx_hash: String },
    TimedOut,
    Replaced { replacing_hash: String },
    Errored { reason: String },
}

impl InteractionResult {
    fn into_outcome(self) -> FutureOutcome {
        match self {
            InteractionResult::Confirmed { .. } => {
                FutureOutcome::Failed("unhandled confirmation".to_string())
            }
            InteractionResult::TimedOut => FutureOutcome::TimedOut,
            InteractionResult::Replaced { replacing_hash } => FutureOutcome::Failed(format!(
                "nonce was consumed by a transaction not sent by this run: {replacing_hash}"
            )),
            InteractionResult::Errored { reason } => FutureOutcome::Failed(reason),
        }
    }
}

/// Open an interaction, hand it to the supervisor, and journal the terminal
/// interaction status.
async fn run_interaction(
    ctx: &ExecutionContext<'_>,
    future_id: &str,
    interaction_id: u64,
    request: &TransactionRequest,
) -> Result<InteractionResult, DeployError> {
    let nonce = ctx
        .nonces
        .reserve(ctx.account)
        .await
        .map_err(|e| DeployError::Store {
            reason: e.to_string(),
        })?;

    ctx.journal
        .append(
            ctx.module_id,
            future_id,
            JournalRecord::InteractionOpened {
                interaction_id,
                nonce,
            },
        )
        .await?;

    let observer = JournalingObserver {
        ctx,
        future_id,
        interaction_id,
        last_hash: Mutex::new(String::new()),
    };

    let outcome =
        match supervise_interaction(ctx.client, ctx.policy, request, nonce, &observer).await {
            Ok(outcome) => outcome,
            Err(ChainError::Store { reason }) => return Err(DeployError::Store { reason }),
            Err(e) => {
                // Submission-level RPC failure: the future fails, the run
                // continues for independent subgraphs.
                return Ok(InteractionResult::Errored {
                    reason: e.to_string(),
                });
            }
        };

    let tx_hash = observer.last_hash.lock().unwrap().clone();

    match outcome {
        caravan_chain::InteractionOutcome::Confirmed(receipt) => {
            ctx.journal
                .append(
                    ctx.module_id,
                    future_id,
                    JournalRecord::InteractionConfirmed {
                        interaction_id,
                        receipt: receipt.clone(),
                    },
                )
                .await?;
            ctx.events.emit(DeploymentEvent::TransactionConfirmed {
                future_id: future_id.to_string(),
                interaction_id,
                tx_hash: tx_hash.clone(),
            });
            Ok(InteractionResult::Confirmed { receipt, tx_hash })
        }
        caravan_chain::InteractionOutcome::TimedOut => {
            ctx.journal
                .append(
                    ctx.module_id,
                    future_id,
                    JournalRecord::InteractionTimedOut { interaction_id },
                )
                .await?;
            ctx.events.emit(DeploymentEvent::InteractionTimedOut {
                future_id: future_id.to_string(),
                interaction_id,
            });
            Ok(InteractionResult::TimedOut)
        }
        caravan_chain::InteractionOutcome::ReplacedByUser { replacing_hash } => {
            ctx.journal
                .append(
                    ctx.module_id,
                    future_id,
                    JournalRecord::InteractionReplaced {
                        interaction_id,
                        replacing_hash: replacing_hash.clone(),
                    },
                )
                .await?;
            ctx.events.emit(DeploymentEvent::ReplacedByUser {
                future_id: future_id.to_string(),
                interaction_id,
                replacing_hash: replacing_hash.clone(),
            });
            Ok(InteractionResult::Replaced { replacing_hash })
        }
    }
}

/// Bridges supervisor callbacks into journal records and lifecycle events,
/// so every send is durable before the next poll.
struct JournalingObserver<'a> {
    ctx: &'a ExecutionContext<'a>,
    future_id: &'a str,
    interaction_id: u64,
    last_hash: Mutex<String>,
}

#[async_trait]
impl InteractionObserver for JournalingObserver<'_> {
    async fn transaction_sent(
        &self,
        tx_hash: &str,
        fees: FeeSnapshot,
        kind: ResendKind,
    ) -> Result<(), ChainError> {
        self.ctx
            .journal
            .append(
                self.ctx.module_id,
                self.future_id,
                JournalRecord::TransactionSent {
                    interaction_id: self.interaction_id,
                    tx_hash: tx_hash.to_string(),
                },
            )
            .await
            .map_err(|e| ChainError::Store {
                reason: e.to_string(),
            })?;

        *self.last_hash.lock().unwrap() = tx_hash.to_string();

        let event = match kind {
            ResendKind::FeeBump => DeploymentEvent::FeeBumped {
                future_id: self.future_id.to_string(),
                interaction_id: self.interaction_id,
                tx_hash: tx_hash.to_string(),
                fees,
            },
            _ => DeploymentEvent::TransactionSent {
                future_id: self.future_id.to_string(),
                interaction_id: self.interaction_id,
                tx_hash: tx_hash.to_string(),
                fees,
            },
        };
        self.ctx.events.emit(event);
        Ok(())
    }

    async fn transaction_dropped(&self) -> Result<(), ChainError> {
        self.ctx
            .journal
            .append(
                self.ctx.module_id,
                self.future_id,
                JournalRecord::InteractionDropped {
                    interaction_id: self.interaction_id,
                },
            )
            .await
            .map_err(|e| ChainError::Store {
                reason: e.to_string(),
            })?;

        self.ctx.events.emit(DeploymentEvent::TransactionDropped {
            future_id: self.future_id.to_string(),
            interaction_id: self.interaction_id,
        });
        Ok(())
    }
}
