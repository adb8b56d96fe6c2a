//! Fx-hashed map and set aliases.
//!
//! Registries index store keys per container, and union constructors check
//! member names for duplicates. Both are lookups on short strings taken from
//! the application's own declarations, so the Fx algorithm from `rustc-hash`
//! is used in place of SipHash.
//!
//! ```
//! use aj_core::FxHashMap;
//!
//! let mut by_container: FxHashMap<&str, &str> = FxHashMap::default();
//! by_container.insert("settings", "__a");
//! assert_eq!(by_container.get("settings"), Some(&"__a"));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_lookup_by_str() {
        let mut by_container: FxHashMap<String, FxHashMap<String, String>> =
            FxHashMap::default();
        by_container
            .entry("settings".to_owned())
            .or_default()
            .insert("__a".to_owned(), "a".to_owned());

        let found = by_container.get("settings").and_then(|keys| keys.get("__a"));
        assert_eq!(found.map(String::as_str), Some("a"));
        assert!(by_container.get("json_attributes").is_none());
    }

    #[test]
    fn test_set_detects_duplicates() {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        assert!(seen.insert("Circle"));
        assert!(!seen.insert("Circle"));
    }
}
