use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::Value;

/// An argument position in a future's payload.
///
/// Arguments form a recursive tree: a leaf is either a concrete value or a
/// reference to another future's eventual result, and composites nest
/// arbitrarily. References are resolved bottom-up against accumulated results
/// before submission, never lazily at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    Literal(Value),
    /// The eventual result of the named future.
    Future(String),
    List(Vec<Argument>),
    Map(BTreeMap<String, Argument>),
}

impl Argument {
    pub fn literal(value: impl Into<Value>) -> Self {
        Argument::Literal(value.into())
    }

    pub fn future(id: impl Into<String>) -> Self {
        Argument::Future(id.into())
    }

    /// Collect every future id referenced anywhere in this tree.
    pub fn referenced_futures(&self, out: &mut BTreeSet<String>) {
        match self {
            Argument::Literal(_) => {}
            Argument::Future(id) => {
                out.insert(id.clone());
            }
            Argument::List(items) => {
                for item in items {
                    item.referenced_futures(out);
                }
            }
            Argument::Map(entries) => {
                for arg in entries.values() {
                    arg.referenced_futures(out);
                }
            }
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Literal(value)
    }
}

/// A single deferred unit of on-chain work.
///
/// Futures are immutable after module construction; the variant payload plus
/// the derived dependency set fully determine what will run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Future {
    /// Stable id, unique within its module.
    pub id: String,

    pub kind: FutureKind,
}

/// Variant payloads for the closed set of supported on-chain actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FutureKind {
    /// Deploy a contract from a named artifact.
    ContractDeploy {
        artifact: String,
        args: Vec<Argument>,
        /// Library name -> address-producing argument, substituted into
        /// unlinked bytecode before submission.
        libraries: BTreeMap<String, Argument>,
        value: u128,
    },

    /// Submit a state-mutating call against a contract.
    ContractCall {
        /// Address literal or reference to a contract-producing future.
        contract: Argument,
        /// Bare name or full signature, resolved against the interface.
        method: String,
        args: Vec<Argument>,
        value: u128,
    },

    /// Read-only call; produces data without a network interaction record.
    StaticCall {
        contract: Argument,
        method: String,
        args: Vec<Argument>,
    },

    /// Send raw calldata to an address.
    SendData {
        to: Argument,
        /// 0x-prefixed hex payload.
        data: String,
        value: u128,
    },

    /// Bind an existing address to an interface. No network interaction.
    ContractAt {
        artifact: String,
        address: Argument,
    },

    /// Read one argument of an event emitted by a prior future's transaction.
    ReadEventArg {
        /// Future whose confirmed interaction holds the logs.
        emitter: String,
        event: String,
        argument: String,
        /// Which occurrence of the event within the receipt.
        event_index: usize,
    },
}

impl Future {
    pub fn new(id: impl Into<String>, kind: FutureKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Every other future this one depends on, directly or nested inside
    /// arguments. Derived, not declared.
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        match &self.kind {
            FutureKind::ContractDeploy {
                args, libraries, ..
            } => {
                for arg in args {
                    arg.referenced_futures(&mut deps);
                }
                for lib in libraries.values() {
                    lib.referenced_futures(&mut deps);
                }
            }
            FutureKind::ContractCall {
                contract, args, ..
            }
            | FutureKind::StaticCall {
                contract, args, ..
            } => {
                contract.referenced_futures(&mut deps);
                for arg in args {
                    arg.referenced_futures(&mut deps);
                }
            }
            FutureKind::SendData { to, .. } => {
                to.referenced_futures(&mut deps);
            }
            FutureKind::ContractAt { address, .. } => {
                address.referenced_futures(&mut deps);
            }
            FutureKind::ReadEventArg { emitter, .. } => {
                deps.insert(emitter.clone());
            }
        }
        deps
    }

    /// Artifact name this future needs from the artifact source, if any.
    pub fn artifact_name(&self) -> Option<&str> {
        match &self.kind {
            FutureKind::ContractDeploy { artifact, .. }
            | FutureKind::ContractAt { artifact, .. } => Some(artifact),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_from_nested_arguments() {
        let future = Future::new(
            "deploy",
            FutureKind::ContractDeploy {
                artifact: "Vault".to_string(),
                args: vec![
                    Argument::literal(Value::Uint(1)),
                    Argument::List(vec![
                        Argument::future("token"),
                        Argument::Map(BTreeMap::from([(
                            "owner".to_string(),
                            Argument::future("registry"),
                        )])),
                    ]),
                ],
                libraries: BTreeMap::from([("Math".to_string(), Argument::future("math-lib"))]),
                value: 0,
            },
        );

        let deps = future.dependencies();
        assert_eq!(
            deps,
            BTreeSet::from([
                "token".to_string(),
                "registry".to_string(),
                "math-lib".to_string()
            ])
        );
    }

    #[test]
    fn test_dependencies_of_event_read() {
        let future = Future::new(
            "read",
            FutureKind::ReadEventArg {
                emitter: "deploy".to_string(),
                event: "Created".to_string(),
                argument: "id".to_string(),
                event_index: 0,
            },
        );
        assert_eq!(future.dependencies(), BTreeSet::from(["deploy".to_string()]));
    }

    #[test]
    fn test_literal_only_future_has_no_dependencies() {
        let future = Future::new(
            "send",
            FutureKind::SendData {
                to: Argument::literal(Value::address("0x1234")),
                data: "0xdeadbeef".to_string(),
                value: 7,
            },
        );
        assert!(future.dependencies().is_empty());
    }
}
