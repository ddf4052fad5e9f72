//! Identifier resolution boundary.
//!
//! The resolution backend (gene-symbol and chemical lookup services) lives
//! outside this crate. Parsers and the unifier only see the [`Resolver`]
//! trait, passed in explicitly, so conversions are deterministic under a
//! mocked resolver and never reach for a global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Namespace;

/// Canonical identity returned by a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedId {
    pub namespace: Namespace,
    pub id: String,
    /// Preferred display name (e.g. the current HGNC symbol).
    pub name: String,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Ordinary miss: the backend knows the namespace but not this id.
    #[error("no canonical identifier for {namespace}:{raw_id}")]
    Unresolved { namespace: Namespace, raw_id: String },
    /// Degraded backend (timeout, unknown namespace). Still non-fatal to
    /// conversion: the entity is kept with its raw identifier.
    #[error("resolver backend failed for {namespace}:{raw_id}: {detail}")]
    Backend {
        namespace: Namespace,
        raw_id: String,
        detail: String,
    },
}

/// External identifier resolution capability.
///
/// Calls may block (the real backend is remote); callers must not hold any
/// cross-pathway lock across a call.
pub trait Resolver: Sync {
    fn resolve(&self, namespace: &Namespace, raw_id: &str) -> Result<ResolvedId, ResolveError>;
}

/// Resolver that knows nothing. Conversion still succeeds; every entity is
/// retained unresolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl Resolver for NullResolver {
    fn resolve(&self, namespace: &Namespace, raw_id: &str) -> Result<ResolvedId, ResolveError> {
        Err(ResolveError::Unresolved {
            namespace: namespace.clone(),
            raw_id: raw_id.to_string(),
        })
    }
}

/// In-memory resolver backed by an explicit mapping table.
///
/// Used by tests and by the CLI's `--resolver-map` debugging input.
#[derive(Debug, Default, Clone)]
pub struct MapResolver {
    entries: HashMap<(Namespace, String), ResolvedId>,
}

impl MapResolver {
    pub fn new() -> MapResolver {
        MapResolver::default()
    }

    pub fn insert(
        &mut self,
        namespace: Namespace,
        raw_id: impl Into<String>,
        resolved: ResolvedId,
    ) {
        self.entries.insert((namespace, raw_id.into()), resolved);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Resolver for MapResolver {
    fn resolve(&self, namespace: &Namespace, raw_id: &str) -> Result<ResolvedId, ResolveError> {
        self.entries
            .get(&(namespace.clone(), raw_id.to_string()))
            .cloned()
            .ok_or_else(|| ResolveError::Unresolved {
                namespace: namespace.clone(),
                raw_id: raw_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_resolver_hits_and_misses() {
        let mut resolver = MapResolver::new();
        resolver.insert(
            Namespace::Entrez,
            "217",
            ResolvedId {
                namespace: Namespace::Hgnc,
                id: "404".to_string(),
                name: "ALDH2".to_string(),
            },
        );

        let hit = resolver.resolve(&Namespace::Entrez, "217").unwrap();
        assert_eq!(hit.name, "ALDH2");

        let miss = resolver.resolve(&Namespace::Entrez, "999999");
        assert!(matches!(miss, Err(ResolveError::Unresolved { .. })));
    }
}
