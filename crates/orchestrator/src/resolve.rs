use std::collections::{BTreeMap, HashMap};

use sha2::{Digest, Sha256};

use caravan_types::{Argument, Future, FutureKind, FutureResult, Value};

/// Resolve an argument tree bottom-up against the accumulated result map.
///
/// A future reference resolves to its stored result; a reference nested
/// inside a composite resolves recursively; any contract-typed value is
/// coerced to its address. Fails if a referenced future has no result yet,
/// which the batcher guarantees cannot happen for scheduled futures.
pub fn resolve_argument(
    arg: &Argument,
    results: &HashMap<String, FutureResult>,
) -> Result<Value, String> {
    match arg {
        Argument::Literal(value) => Ok(value.clone()),
        Argument::Future(id) => results
            .get(id)
            .map(FutureResult::to_value)
            .ok_or_else(|| format!("result of future {id} is not available")),
        Argument::List(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_argument(item, results)?);
            }
            Ok(Value::List(resolved))
        }
        Argument::Map(entries) => {
            let mut resolved = BTreeMap::new();
            for (key, value) in entries {
                resolved.insert(key.clone(), resolve_argument(value, results)?);
            }
            Ok(Value::Map(resolved))
        }
    }
}

/// Resolve every argument position of a list.
pub fn resolve_arguments(
    args: &[Argument],
    results: &HashMap<String, FutureResult>,
) -> Result<Vec<Value>, String> {
    args.iter().map(|a| resolve_argument(a, results)).collect()
}

/// Resolve an argument that must produce an address (a call target, a
/// library, a binding).
pub fn resolve_address(
    arg: &Argument,
    results: &HashMap<String, FutureResult>,
) -> Result<String, String> {
    match resolve_argument(arg, results)? {
        Value::Address(addr) => Ok(addr),
        other => Err(format!("expected an address, got {other:?}")),
    }
}

pub fn bytecode_hash(bytecode: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytecode.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical JSON of a future's fully resolved inputs.
///
/// This is what the journal records at execution start and what
/// reconciliation compares across runs: resolved values only, never
/// symbolic references, so renamed-but-equivalent dependencies reconcile
/// cleanly.
pub fn resolved_inputs(
    future: &Future,
    results: &HashMap<String, FutureResult>,
    artifact_bytecode: Option<&str>,
) -> Result<serde_json::Value, String> {
    let json = |v: &Value| serde_json::to_value(v).map_err(|e| e.to_string());

    match &future.kind {
        FutureKind::ContractDeploy {
            artifact,
            args,
            libraries,
            value,
        } => {
            let resolved_args = resolve_arguments(args, results)?;
            let mut resolved_libraries = BTreeMap::new();
            for (name, lib) in libraries {
                resolved_libraries.insert(name.clone(), resolve_address(lib, results)?);
            }
            Ok(serde_json::json!({
                "kind": "contract_deploy",
                "artifact": artifact,
                "bytecode_hash": artifact_bytecode.map(bytecode_hash),
                "args": resolved_args.iter().map(&json).collect::<Result<Vec<_>, _>>()?,
                "libraries": resolved_libraries,
                "value": value.to_string(),
            }))
        }
        FutureKind::ContractCall {
            contract,
            method,
            args,
            value,
        } => Ok(serde_json::json!({
            "kind": "contract_call",
            "to": resolve_address(contract, results)?,
            "method": method,
            "args": resolve_arguments(args, results)?
                .iter().map(&json).collect::<Result<Vec<_>, _>>()?,
            "value": value.to_string(),
        })),
        FutureKind::StaticCall {
            contract,
            method,
            args,
        } => Ok(serde_json::json!({
            "kind": "static_call",
            "to": resolve_address(contract, results)?,
            "method": method,
            "args": resolve_arguments(args, results)?
                .iter().map(&json).collect::<Result<Vec<_>, _>>()?,
        })),
        FutureKind::SendData { to, data, value } => Ok(serde_json::json!({
            "kind": "send_data",
            "to": resolve_address(to, results)?,
            "data": data,
            "value": value.to_string(),
        })),
        FutureKind::ContractAt { artifact, address } => Ok(serde_json::json!({
            "kind": "contract_at",
            "artifact": artifact,
            "address": resolve_address(address, results)?,
        })),
        FutureKind::ReadEventArg {
            emitter,
            event,
            argument,
            event_index,
        } => {
            // The emitter's identity across runs is its resolved result,
            // not its id.
            let emitter_result = results
                .get(emitter)
                .map(|r| serde_json::to_value(r).map_err(|e| e.to_string()))
                .transpose()?;
            Ok(serde_json::json!({
                "kind": "read_event_arg",
                "emitter_result": emitter_result,
                "event": event,
                "argument": argument,
                "event_index": event_index,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_with_contract() -> HashMap<String, FutureResult> {
        HashMap::from([(
            "token".to_string(),
            FutureResult::Contract {
                contract_name: "Token".to_string(),
                address: "0xtoken".to_string(),
                abi: Vec::new(),
                bytecode: "0x60".to_string(),
            },
        )])
    }

    #[test]
    fn test_future_reference_coerces_contract_to_address() {
        let value =
            resolve_argument(&Argument::future("token"), &results_with_contract()).unwrap();
        assert_eq!(value, Value::Address("0xtoken".to_string()));
    }

    #[test]
    fn test_nested_composite_resolution() {
        let arg = Argument::List(vec![
            Argument::literal(Value::Uint(5)),
            Argument::Map(BTreeMap::from([(
                "spender".to_string(),
                Argument::future("token"),
            )])),
        ]);

        let value = resolve_argument(&arg, &results_with_contract()).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Uint(5),
                Value::Map(BTreeMap::from([(
                    "spender".to_string(),
                    Value::Address("0xtoken".to_string())
                )]))
            ])
        );
    }

    #[test]
    fn test_unresolved_reference_is_an_error() {
        let err = resolve_argument(&Argument::future("ghost"), &HashMap::new()).unwrap_err();
        assert!(err.contains("ghost"));
    }

    #[test]
    fn test_resolved_inputs_are_stable_across_dependency_renames() {
        // Two modules name the same dependency differently; the resolved
        // inputs are identical because only values are recorded.
        let call = |dep: &str| {
            Future::new(
                "call",
                FutureKind::ContractCall {
                    contract: Argument::future(dep),
                    method: "init".to_string(),
                    args: vec![Argument::future(dep)],
                    value: 0,
                },
            )
        };

        let contract = FutureResult::Contract {
            contract_name: "Token".to_string(),
            address: "0xtoken".to_string(),
            abi: Vec::new(),
            bytecode: "0x60".to_string(),
        };
        let results_a = HashMap::from([("token".to_string(), contract.clone())]);
        let results_b = HashMap::from([("renamed".to_string(), contract)]);

        let a = resolved_inputs(&call("token"), &results_a, None).unwrap();
        let b = resolved_inputs(&call("renamed"), &results_b, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_deploy_inputs_include_bytecode_hash() {
        let future = Future::new(
            "deploy",
            FutureKind::ContractDeploy {
                artifact: "Token".to_string(),
                args: Vec::new(),
                libraries: BTreeMap::new(),
                value: 0,
            },
        );

        let with_hash = resolved_inputs(&future, &HashMap::new(), Some("0x6080")).unwrap();
        let other_hash = resolved_inputs(&future, &HashMap::new(), Some("0x6081")).unwrap();
        assert_ne!(with_hash["bytecode_hash"], other_hash["bytecode_hash"]);
    }
}
