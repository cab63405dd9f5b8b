//! Deterministic cache key derivation
//!
//! A key is the hex-encoded SHA-256 of the query text, the filter
//! predicates, and the model version. Filter order must not matter:
//! two logically identical queries have to collide, so the predicate
//! pairs are sorted before hashing.

use sha2::{Digest, Sha256};

/// Deterministic cache key for a RAG result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from the query, filter predicates, and model version.
    ///
    /// # Arguments
    /// * `query` - The raw query text
    /// * `filters` - Exact-match predicate pairs; order-insensitive
    /// * `model_version` - Model identifier the answer was generated with
    #[must_use]
    pub fn derive<'a, I>(query: &str, filters: I, model_version: &str) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut pairs: Vec<(&str, &str)> = filters.into_iter().collect();
        pairs.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        hasher.update([0u8]);
        for (name, value) in pairs {
            hasher.update(name.as_bytes());
            hasher.update([0x1f]);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(model_version.as_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest backing this key
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_inputs_collide() {
        let a = CacheKey::derive("photosynthesis", [("subject", "Biology")], "llama3:8b");
        let b = CacheKey::derive("photosynthesis", [("subject", "Biology")], "llama3:8b");
        assert_eq!(a, b);
    }

    #[test]
    fn filter_order_is_irrelevant() {
        let a = CacheKey::derive(
            "fractions",
            [("subject", "Math"), ("class", "8")],
            "llama3:8b",
        );
        let b = CacheKey::derive(
            "fractions",
            [("class", "8"), ("subject", "Math")],
            "llama3:8b",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn model_version_changes_key() {
        let a = CacheKey::derive("fractions", [("subject", "Math")], "llama3:8b");
        let b = CacheKey::derive("fractions", [("subject", "Math")], "llama3:70b");
        assert_ne!(a, b);
    }

    #[test]
    fn predicate_boundaries_are_unambiguous() {
        // ("ab", "c") and ("a", "bc") must not hash identically
        let a = CacheKey::derive("q", [("ab", "c")], "m");
        let b = CacheKey::derive("q", [("a", "bc")], "m");
        assert_ne!(a, b);
    }
}
