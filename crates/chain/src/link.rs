use std::collections::BTreeMap;

/// Substitute resolved library addresses into unlinked bytecode.
///
/// Placeholders use the `__Name__` convention; the substituted address is
/// the bare 40-char hex, without the 0x prefix.
pub fn link_bytecode(bytecode: &str, libraries: &BTreeMap<String, String>) -> String {
    let mut linked = bytecode.to_string();
    for (name, address) in libraries {
        let placeholder = format!("__{name}__");
        let bare = address.trim_start_matches("0x");
        linked = linked.replace(&placeholder, bare);
    }
    linked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_placeholders() {
        let libraries = BTreeMap::from([(
            "Math".to_string(),
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
        )]);
        let linked = link_bytecode("0x6080__Math__6001", &libraries);
        assert_eq!(
            linked,
            "0x6080aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa6001"
        );
    }

    #[test]
    fn test_no_placeholder_is_identity() {
        let linked = link_bytecode("0x6080", &BTreeMap::new());
        assert_eq!(linked, "0x6080");
    }
}
