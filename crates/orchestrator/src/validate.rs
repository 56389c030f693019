use std::collections::BTreeMap;

use caravan_abi::{resolve_constructor, resolve_function};
use caravan_chain::ArtifactSource;
use caravan_graph::Module;
use caravan_types::{Argument, Artifact, FutureKind};

/// Validate every future of a module against static artifact data.
///
/// Runs before any network interaction; failures are aggregated per future
/// id into human-readable messages. An empty map means the module is clear
/// to execute.
pub fn validate_module(
    module: &Module,
    artifacts: &dyn ArtifactSource,
) -> BTreeMap<String, Vec<String>> {
    let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for future in module.futures() {
        let mut messages = Vec::new();

        match &future.kind {
            FutureKind::ContractDeploy {
                artifact, args, ..
            } => {
                if let Some(loaded) = checked_artifact(artifacts, artifact, &mut messages) {
                    if let Err(e) = resolve_constructor(&loaded, args.len()) {
                        messages.push(e.to_string());
                    }
                }
            }

            FutureKind::ContractAt { artifact, .. } => {
                checked_artifact(artifacts, artifact, &mut messages);
            }

            FutureKind::ContractCall {
                contract,
                method,
                args,
                ..
            }
            | FutureKind::StaticCall {
                contract,
                method,
                args,
            } => {
                // Function resolution needs the target's interface, which is
                // only statically known when the target is another future in
                // this module. Literal address targets are checked at
                // execution time against the bound result.
                if let Some(loaded) = target_artifact(module, contract, artifacts) {
                    if let Err(e) = resolve_function(&loaded, method, args.len()) {
                        messages.push(e.to_string());
                    }
                }
            }

            FutureKind::SendData { data, .. } => {
                if !data.starts_with("0x") {
                    messages.push(format!("Invalid hex data: {data}"));
                }
            }

            FutureKind::ReadEventArg {
                emitter,
                event,
                argument,
                ..
            } => {
                if let Some(loaded) =
                    target_artifact(module, &Argument::future(emitter.clone()), artifacts)
                {
                    match loaded.event(event) {
                        None => messages.push(format!(
                            "Contract '{}' doesn't have an event {}",
                            loaded.contract_name, event
                        )),
                        Some(entry) => {
                            if !entry.inputs.iter().any(|p| p.name == *argument) {
                                messages.push(format!(
                                    "Event {} of contract '{}' has no argument {}",
                                    event, loaded.contract_name, argument
                                ));
                            }
                        }
                    }
                }
            }
        }

        if !messages.is_empty() {
            errors.insert(future.id.clone(), messages);
        }
    }

    errors
}

fn checked_artifact(
    artifacts: &dyn ArtifactSource,
    name: &str,
    messages: &mut Vec<String>,
) -> Option<Artifact> {
    if !artifacts.has_artifact(name) {
        messages.push(format!("Artifact for contract '{name}' is missing"));
        return None;
    }
    match artifacts.get_artifact(name) {
        Ok(artifact) if artifact.is_valid() => Some(artifact),
        Ok(_) => {
            messages.push(format!("Artifact for contract '{name}' is invalid"));
            None
        }
        Err(e) => {
            messages.push(e.to_string());
            None
        }
    }
}

/// The interface of a call target, when the target is a contract-producing
/// future of this module.
fn target_artifact(
    module: &Module,
    contract: &Argument,
    artifacts: &dyn ArtifactSource,
) -> Option<Artifact> {
    let Argument::Future(target_id) = contract else {
        return None;
    };
    let target = module.get(target_id)?;
    let name = target.artifact_name()?;
    artifacts.get_artifact(name).ok().filter(Artifact::is_valid)
}
