//! Compile Cache
//!
//! Memoizes compile results by a SHA-256 digest of the registration
//! identifier and its canonical parameters.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

use crate::compile::{compile, CompileResult};
use crate::error::Result;
use crate::registration::RegistrationNode;
use crate::variants::CompileParameters;

/// Host-owned memo table for compile results.
///
/// Entries are keyed by identifier and canonical parameters, so the cache
/// must be cleared whenever the registration forest is reloaded.
#[derive(Debug, Default)]
pub struct CompileCache {
    entries: HashMap<String, CompileResult>,
    hits: u64,
    misses: u64,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_key(identifier: &str, params: &CompileParameters) -> String {
        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        hasher.update([0u8]);
        hasher.update(params.to_canonical_json().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, identifier: &str, params: &CompileParameters) -> Option<&CompileResult> {
        self.entries.get(&Self::compute_key(identifier, params))
    }

    /// Returns the cached result, compiling and storing it on a miss.
    /// Failed compilations are not cached.
    pub fn get_or_compile(
        &mut self,
        node: &RegistrationNode,
        params: &CompileParameters,
    ) -> Result<CompileResult> {
        let key = Self::compute_key(&node.identifier, params);
        if let Some(result) = self.entries.get(&key) {
            self.hits += 1;
            debug!(identifier = %node.identifier, "compile cache hit");
            return Ok(result.clone());
        }

        self.misses += 1;
        let result = compile(node, params)?;
        self.entries.insert(key, result.clone());
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::StyleSource;
    use crate::variants::ParameterValue;

    fn badge() -> RegistrationNode {
        RegistrationNode::new("badge")
            .prop("tone", ["loud", "quiet"])
            .style(
                "a",
                StyleSource::builder()
                    .select("tone", [("loud", "font-bold"), ("quiet", "font-light")])
                    .build(),
            )
    }

    #[test]
    fn test_key_depends_on_identifier_and_params() {
        let loud = CompileParameters::new().with("tone", ParameterValue::literal("loud"));
        let quiet = CompileParameters::new().with("tone", ParameterValue::literal("quiet"));
        let a = CompileCache::compute_key("badge", &loud);
        assert_eq!(a, CompileCache::compute_key("badge", &loud));
        assert_ne!(a, CompileCache::compute_key("badge", &quiet));
        assert_ne!(a, CompileCache::compute_key("chip", &loud));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hits_and_misses() {
        let mut cache = CompileCache::new();
        let node = badge();
        let params = CompileParameters::new().with("tone", ParameterValue::literal("loud"));

        let first = cache.get_or_compile(&node, &params).unwrap();
        let second = cache.get_or_compile(&node, &params).unwrap();
        assert_eq!(first, second);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("badge", &params).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache = CompileCache::new();
        assert!(cache.get_or_compile(&badge(), &CompileParameters::new()).is_err());
        assert!(cache.is_empty());
    }
}
