use serde::{Deserialize, Serialize};

/// Compiled contract artifact: the static data validation and deployment run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Contract name as declared in the source unit
    pub contract_name: String,

    /// Interface entries (functions, constructor, events)
    pub abi: Vec<AbiEntry>,

    /// Deployable bytecode, 0x-prefixed hex. May contain `__Name__`
    /// placeholders for unlinked libraries.
    pub bytecode: String,
}

impl Artifact {
    /// Minimal well-formedness: an ABI and non-empty bytecode.
    pub fn is_valid(&self) -> bool {
        !self.bytecode.is_empty() && self.bytecode != "0x"
    }

    /// All function entries named `name`.
    pub fn functions_named(&self, name: &str) -> Vec<&AbiEntry> {
        self.abi
            .iter()
            .filter(|e| e.kind == AbiEntryKind::Function && e.name == name)
            .collect()
    }

    /// The constructor entry, if the contract declares one.
    pub fn constructor(&self) -> Option<&AbiEntry> {
        self.abi.iter().find(|e| e.kind == AbiEntryKind::Constructor)
    }

    /// The event entry named `name`, if any.
    pub fn event(&self, name: &str) -> Option<&AbiEntry> {
        self.abi
            .iter()
            .find(|e| e.kind == AbiEntryKind::Event && e.name == name)
    }
}

/// Kind of an interface entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiEntryKind {
    Function,
    Constructor,
    Event,
}

/// One entry of a contract interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    pub kind: AbiEntryKind,

    /// Entry name; empty for constructors.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub inputs: Vec<AbiParam>,

    #[serde(default)]
    pub outputs: Vec<AbiParam>,
}

impl AbiEntry {
    pub fn function(name: impl Into<String>, inputs: Vec<AbiParam>) -> Self {
        Self {
            kind: AbiEntryKind::Function,
            name: name.into(),
            inputs,
            outputs: Vec::new(),
        }
    }

    pub fn constructor(inputs: Vec<AbiParam>) -> Self {
        Self {
            kind: AbiEntryKind::Constructor,
            name: String::new(),
            inputs,
            outputs: Vec::new(),
        }
    }

    pub fn event(name: impl Into<String>, inputs: Vec<AbiParam>) -> Self {
        Self {
            kind: AbiEntryKind::Event,
            name: name.into(),
            inputs,
            outputs: Vec::new(),
        }
    }

    /// Canonical signature, e.g. `inc(bool,uint256)`.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.inputs.iter().map(|p| p.type_name.as_str()).collect();
        format!("{}({})", self.name, params.join(","))
    }
}

/// A named, typed interface parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    pub name: String,

    /// Canonical type name, e.g. `uint256`
    pub type_name: String,
}

impl AbiParam {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}
