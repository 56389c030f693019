use thiserror::Error;

use caravan_types::{AbiEntry, Artifact};

/// A symbolic method reference that could not be resolved against a contract
/// interface. Pure static-data failures; nothing here touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Contract '{contract}' doesn't have a function {method}")]
    FunctionNotFound { contract: String, method: String },

    #[error(
        "Function {name} in contract {contract} expects {expected} arguments but {given} were given"
    )]
    ArgumentCountMismatch {
        contract: String,
        name: String,
        expected: usize,
        given: usize,
    },

    #[error(
        "Function {name} in contract {contract} is overloaded, but no overload expects {given} arguments"
    )]
    NoMatchingOverload {
        contract: String,
        name: String,
        given: usize,
    },

    #[error("The number of params does not match the constructor")]
    ConstructorArgumentMismatch,
}

/// Resolve a method reference against a contract interface and validate the
/// argument count.
///
/// A reference containing a parenthesized parameter list (`inc(bool,uint256)`)
/// is matched exactly against canonical signatures. A bare name is matched by
/// name, with overloads disambiguated by argument count. Deterministic and
/// side-effect free.
pub fn resolve_function<'a>(
    artifact: &'a Artifact,
    method: &str,
    arg_count: usize,
) -> Result<&'a AbiEntry, ResolveError> {
    if method.contains('(') {
        let entry = artifact
            .abi
            .iter()
            .find(|e| e.signature() == method)
            .ok_or_else(|| ResolveError::FunctionNotFound {
                contract: artifact.contract_name.clone(),
                method: method.to_string(),
            })?;

        if entry.inputs.len() != arg_count {
            return Err(ResolveError::ArgumentCountMismatch {
                contract: artifact.contract_name.clone(),
                name: entry.name.clone(),
                expected: entry.inputs.len(),
                given: arg_count,
            });
        }
        return Ok(entry);
    }

    let candidates: Vec<&AbiEntry> = artifact.functions_named(method);

    match candidates.len() {
        0 => Err(ResolveError::FunctionNotFound {
            contract: artifact.contract_name.clone(),
            method: method.to_string(),
        }),
        1 => {
            let entry = candidates[0];
            if entry.inputs.len() != arg_count {
                return Err(ResolveError::ArgumentCountMismatch {
                    contract: artifact.contract_name.clone(),
                    name: entry.name.clone(),
                    expected: entry.inputs.len(),
                    given: arg_count,
                });
            }
            Ok(entry)
        }
        _ => candidates
            .into_iter()
            .find(|e| e.inputs.len() == arg_count)
            .ok_or_else(|| ResolveError::NoMatchingOverload {
                contract: artifact.contract_name.clone(),
                name: method.to_string(),
                given: arg_count,
            }),
    }
}

/// Validate deployment arguments against the declared constructor.
/// A contract without a constructor entry accepts only zero arguments.
pub fn resolve_constructor(artifact: &Artifact, arg_count: usize) -> Result<(), ResolveError> {
    let expected = artifact.constructor().map(|c| c.inputs.len()).unwrap_or(0);
    if expected != arg_count {
        return Err(ResolveError::ConstructorArgumentMismatch);
    }
    Ok(())
}
