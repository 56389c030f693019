use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use caravan_chain::ArtifactSource;
use caravan_graph::Module;
use caravan_journal::DeploymentSnapshot;
use caravan_types::{ExecutionStatus, FutureResult};

use crate::resolve::resolved_inputs;

/// Outcome of comparing a freshly loaded module against a prior run's store.
#[derive(Debug, Default)]
pub struct ReconciliationReport {
    /// Futures whose stored inputs match the new definition and whose status
    /// is SUCCESS: skipped, stored result reused.
    pub reusable: HashMap<String, FutureResult>,

    /// Futures to schedule into the current run's batching.
    pub to_run: HashSet<String>,

    /// Futures whose stored inputs differ from the new definition, with the
    /// differing fields named. Non-empty conflicts abort the run.
    pub conflicts: BTreeMap<String, Vec<String>>,
}

impl ReconciliationReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Classify every future of the module against the stored snapshot.
///
/// Comparison is structural equality over resolved values (canonical JSON),
/// never over symbolic references: a dependency renamed between runs but
/// resolving to the same value reconciles cleanly.
///
/// A SUCCESS future whose dependency is itself not reusable (wiped, failed,
/// or changed upstream) is classified as incomplete and re-run once the
/// dependency completes.
pub fn reconcile(
    module: &Module,
    snapshot: &DeploymentSnapshot,
    artifacts: &dyn ArtifactSource,
) -> ReconciliationReport {
    let mut report = ReconciliationReport::default();
    let mut visiting: HashSet<String> = HashSet::new();

    for future in module.futures() {
        classify(&future.id, module, snapshot, artifacts, &mut report, &mut visiting);
    }

    report
}

fn classify(
    future_id: &str,
    module: &Module,
    snapshot: &DeploymentSnapshot,
    artifacts: &dyn ArtifactSource,
    report: &mut ReconciliationReport,
    visiting: &mut HashSet<String>,
) {
    if report.reusable.contains_key(future_id)
        || report.to_run.contains(future_id)
        || report.conflicts.contains_key(future_id)
        || !visiting.insert(future_id.to_string())
    {
        return;
    }

    let future = match module.get(future_id) {
        Some(f) => f,
        None => return,
    };

    // Dependencies first: reuse is only possible on a fully reusable base.
    let mut deps_reusable = true;
    for dep in future.dependencies() {
        classify(&dep, module, snapshot, artifacts, report, visiting);
        if !report.reusable.contains_key(&dep) {
            deps_reusable = false;
        }
    }

    let state = match snapshot.state(future_id) {
        Some(state) if state.status != ExecutionStatus::Unstarted => state,
        // Absent from the prior store (or explicitly wiped): always
        // schedulable fresh.
        _ => {
            report.to_run.insert(future_id.to_string());
            return;
        }
    };

    if !deps_reusable {
        debug!(future_id, "dependency no longer complete, re-running");
        report.to_run.insert(future_id.to_string());
        return;
    }

    let stored_inputs = match &state.resolved_inputs {
        Some(inputs) => inputs,
        None => {
            report.to_run.insert(future_id.to_string());
            return;
        }
    };

    let bytecode = future
        .artifact_name()
        .and_then(|name| artifacts.get_artifact(name).ok())
        .map(|a| a.bytecode);
    let current_inputs =
        match resolved_inputs(future, &report.reusable, bytecode.as_deref()) {
            Ok(inputs) => inputs,
            Err(_) => {
                report.to_run.insert(future_id.to_string());
                return;
            }
        };

    let differing = differing_fields(stored_inputs, &current_inputs);
    if !differing.is_empty() {
        report.conflicts.insert(
            future_id.to_string(),
            differing
                .into_iter()
                .map(|field| format!("stored value of `{field}` differs from the module"))
                .collect(),
        );
        return;
    }

    match (&state.status, &state.result) {
        (ExecutionStatus::Success, Some(result)) => {
            report
                .reusable
                .insert(future_id.to_string(), result.clone());
        }
        _ => {
            report.to_run.insert(future_id.to_string());
        }
    }
}

/// Top-level fields on which two canonical input objects disagree.
fn differing_fields(stored: &serde_json::Value, current: &serde_json::Value) -> Vec<String> {
    match (stored.as_object(), current.as_object()) {
        (Some(stored), Some(current)) => {
            let mut fields: Vec<String> = Vec::new();
            let keys: HashSet<&String> = stored.keys().chain(current.keys()).collect();
            for key in keys {
                if stored.get(key.as_str()) != current.get(key.as_str()) {
                    fields.push(key.clone());
                }
            }
            fields.sort();
            fields
        }
        _ => {
            if stored == current {
                Vec::new()
            } else {
                vec!["inputs".to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravan_chain::InMemoryArtifacts;
    use caravan_journal::{replay, JournalLine, JournalRecord};
    use caravan_types::{Argument, Artifact, Future, FutureKind, Value};

    fn artifacts() -> InMemoryArtifacts {
        InMemoryArtifacts::new().with(Artifact {
            contract_name: "Token".to_string(),
            abi: Vec::new(),
            bytecode: "0x6080".to_string(),
        })
    }

    fn deploy(id: &str, supply: u128) -> Future {
        Future::new(
            id,
            FutureKind::ContractDeploy {
                artifact: "Token".to_string(),
                args: vec![Argument::literal(Value::Uint(supply))],
                libraries: Default::default(),
                value: 0,
            },
        )
    }

    fn call(id: &str, target: &str) -> Future {
        Future::new(
            id,
            FutureKind::ContractCall {
                contract: Argument::future(target),
                method: "init".to_string(),
                args: vec![],
                value: 0,
            },
        )
    }

    fn token_result() -> FutureResult {
        FutureResult::Contract {
            contract_name: "Token".to_string(),
            address: "0xtoken".to_string(),
            abi: Vec::new(),
            bytecode: "0x6080".to_string(),
        }
    }

    /// Snapshot of a completed single-future run with the given inputs.
    fn completed_snapshot(
        module: &Module,
        future_id: &str,
        inputs: serde_json::Value,
        result: FutureResult,
    ) -> DeploymentSnapshot {
        let lines = vec![
            JournalLine::new(
                future_id,
                1,
                JournalRecord::FutureStarted {
                    resolved_inputs: inputs,
                },
            ),
            JournalLine::new(future_id, 2, JournalRecord::FutureSucceeded { result }),
        ];
        DeploymentSnapshot {
            module_id: module.id().to_string(),
            states: replay(&lines),
        }
    }

    fn stored_deploy_inputs(supply: u128) -> serde_json::Value {
        let module = Module::builder("m").add_future(deploy("t", supply)).build().unwrap();
        crate::resolve::resolved_inputs(
            module.get("t").unwrap(),
            &HashMap::new(),
            Some("0x6080"),
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_module_is_fully_schedulable() {
        let module = Module::builder("m")
            .add_future(deploy("t", 100))
            .add_future(call("c", "t"))
            .build()
            .unwrap();

        let report = reconcile(&module, &DeploymentSnapshot::new("m"), &artifacts());
        assert!(report.reusable.is_empty());
        assert!(!report.has_conflicts());
        assert_eq!(report.to_run.len(), 2);
    }

    #[test]
    fn test_unchanged_complete_future_is_reused() {
        let module = Module::builder("m").add_future(deploy("t", 100)).build().unwrap();
        let snapshot =
            completed_snapshot(&module, "t", stored_deploy_inputs(100), token_result());

        let report = reconcile(&module, &snapshot, &artifacts());
        assert!(report.reusable.contains_key("t"));
        assert!(report.to_run.is_empty());
        assert!(!report.has_conflicts());
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let module = Module::builder("m").add_future(deploy("t", 100)).build().unwrap();
        let snapshot =
            completed_snapshot(&module, "t", stored_deploy_inputs(100), token_result());

        for _ in 0..2 {
            let report = reconcile(&module, &snapshot, &artifacts());
            assert_eq!(report.reusable.len(), 1);
            assert!(report.to_run.is_empty(), "nothing may be re-scheduled");
        }
    }

    #[test]
    fn test_changed_definition_conflicts() {
        // Stored run deployed with supply 100; the module now says 200.
        let module = Module::builder("m").add_future(deploy("t", 200)).build().unwrap();
        let snapshot =
            completed_snapshot(&module, "t", stored_deploy_inputs(100), token_result());

        let report = reconcile(&module, &snapshot, &artifacts());
        assert!(report.has_conflicts());
        let messages = &report.conflicts["t"];
        assert!(messages.iter().any(|m| m.contains("args")), "{messages:?}");
    }

    #[test]
    fn test_incomplete_future_resumes() {
        let module = Module::builder("m").add_future(deploy("t", 100)).build().unwrap();
        let lines = vec![JournalLine::new(
            "t",
            1,
            JournalRecord::FutureStarted {
                resolved_inputs: stored_deploy_inputs(100),
            },
        )];
        let snapshot = DeploymentSnapshot {
            module_id: "m".to_string(),
            states: replay(&lines),
        };

        let report = reconcile(&module, &snapshot, &artifacts());
        assert!(report.to_run.contains("t"));
        assert!(!report.has_conflicts());
    }

    #[test]
    fn test_dependent_of_wiped_future_is_rerun() {
        let module = Module::builder("m")
            .add_future(deploy("t", 100))
            .add_future(call("c", "t"))
            .build()
            .unwrap();

        // "c" completed against the old "t" result, but "t" was wiped.
        let call_inputs = serde_json::json!({
            "kind": "contract_call", "to": "0xtoken", "method": "init",
            "args": [], "value": "0",
        });
        let lines = vec![
            JournalLine::new("t", 1, JournalRecord::FutureWiped),
            JournalLine::new(
                "c",
                2,
                JournalRecord::FutureStarted {
                    resolved_inputs: call_inputs,
                },
            ),
            JournalLine::new(
                "c",
                3,
                JournalRecord::FutureSucceeded {
                    result: FutureResult::TxExecuted {
                        tx_hash: "0x1".to_string(),
                    },
                },
            ),
        ];
        let snapshot = DeploymentSnapshot {
            module_id: "m".to_string(),
            states: replay(&lines),
        };

        let report = reconcile(&module, &snapshot, &artifacts());
        assert!(report.to_run.contains("t"), "wiped future re-runs");
        assert!(
            report.to_run.contains("c"),
            "dependent of wiped future re-runs after it"
        );
        assert!(!report.has_conflicts());
    }
}
