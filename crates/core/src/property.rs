//! Ordered property sets
//!
//! A [`PropertySet`] keeps properties in insertion order so dump output is
//! stable. Keys are unique: setting the same key twice on one node is a
//! contract violation. A `None` value marks an explicit deletion.

use crate::error::{DumpError, DumpResult};

/// Ordered, duplicate-free mapping of property keys to values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl PropertySet {
    /// Create an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a property, `None` meaning deletion
    ///
    /// Fails with [`DumpError::DuplicateProperty`] if the key is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<Vec<u8>>) -> DumpResult<()> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(DumpError::DuplicateProperty { key });
        }
        self.entries.push((key, value));
        Ok(())
    }

    /// Append a property with a present value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> DumpResult<()> {
        self.insert(key, Some(value.into()))
    }

    /// Append a deletion marker for a key
    pub fn delete(&mut self, key: impl Into<String>) -> DumpResult<()> {
        self.insert(key, None)
    }

    /// Look up a key; the inner `None` is a deletion marker
    pub fn get(&self, key: &str) -> Option<Option<&[u8]>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&[u8]>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Whether any entry is a deletion marker
    pub fn has_deletions(&self) -> bool {
        self.entries.iter().any(|(_, v)| v.is_none())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut props = PropertySet::new();
        props.set("zeta", "1").unwrap();
        props.set("alpha", "2").unwrap();
        props.delete("mid").unwrap();

        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut props = PropertySet::new();
        props.set("svn:eol-style", "native").unwrap();

        let err = props.delete("svn:eol-style").unwrap_err();
        assert!(matches!(err, DumpError::DuplicateProperty { ref key } if key == "svn:eol-style"));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_get_distinguishes_deletion() {
        let mut props = PropertySet::new();
        props.set("a", "x").unwrap();
        props.delete("b").unwrap();

        assert_eq!(props.get("a"), Some(Some(&b"x"[..])));
        assert_eq!(props.get("b"), Some(None));
        assert_eq!(props.get("c"), None);
        assert!(props.has_deletions());
    }

    #[test]
    fn test_empty_set() {
        let props = PropertySet::new();
        assert!(props.is_empty());
        assert!(!props.has_deletions());
    }
}
