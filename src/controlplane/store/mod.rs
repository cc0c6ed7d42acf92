//! Dependent-object store adapters
//!
//! - [`KubeStore`]: the Kubernetes API server
//! - [`MemoryStore`]: an in-process store with a write log, used by tests

pub mod kubernetes;
pub mod memory;

pub use kubernetes::KubeStore;
pub use memory::{MemoryStore, OpKind, StoreOp};

use std::collections::BTreeMap;

/// Match labels against a selector of comma separated `key` / `key=value` terms
pub(crate) fn selector_matches(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once("!=") {
            Some((key, value)) => labels.get(key.trim()).map_or(true, |v| v != value.trim()),
            None => match term.split_once('=') {
                Some((key, value)) => {
                    let value = value.trim_start_matches('=').trim();
                    labels.get(key.trim()).map_or(false, |v| v == value)
                }
                None => match term.strip_prefix('!') {
                    Some(key) => !labels.contains_key(key),
                    None => labels.contains_key(term),
                },
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_selector_existence_and_equality() {
        let l = labels(&[("storage", ""), ("zone", "a")]);
        assert!(selector_matches(&l, "storage"));
        assert!(selector_matches(&l, "storage,zone=a"));
        assert!(selector_matches(&l, "zone==a"));
        assert!(!selector_matches(&l, "zone=b"));
        assert!(!selector_matches(&l, "rack"));
        assert!(selector_matches(&l, "!rack"));
        assert!(selector_matches(&l, "zone!=b"));
        assert!(selector_matches(&l, ""));
    }
}
