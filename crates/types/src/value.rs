use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A concrete on-chain value, fully resolved and ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Uint(u128),
    Int(i128),
    Text(String),
    /// A 0x-prefixed account or contract address.
    Address(String),
    /// Raw bytes, 0x-prefixed hex.
    Bytes(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn address(addr: impl Into<String>) -> Self {
        Value::Address(addr.into())
    }

    pub fn uint(n: u128) -> Self {
        Value::Uint(n)
    }

    /// The address carried by this value, if it is address-shaped.
    pub fn as_address(&self) -> Option<&str> {
        match self {
            Value::Address(addr) => Some(addr),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u128> for Value {
    fn from(n: u128) -> Self {
        Value::Uint(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Uint(n as u128)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_address() {
        let v = Value::address("0xabc");
        assert_eq!(v.as_address(), Some("0xabc"));
        assert_eq!(Value::Uint(1).as_address(), None);
    }

    #[test]
    fn test_value_serde_roundtrip() {
        let v = Value::List(vec![Value::Bool(true), Value::Uint(42)]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
