//! Entity unification within one parsed pathway.
//!
//! Every entity's cross-references are pushed through the [`Resolver`]; two
//! entities landing on the same canonical identifier are merged into one node
//! and every relationship endpoint and member list is rewritten accordingly.
//!
//! Merging is deterministic and commutative: the surviving representative is
//! the entity with the smallest local id, and merged attribute sets are
//! sorted unions, so processing order cannot change the result.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::model::{Entity, EntityId, Namespace, Resolution};
use crate::resolve::{ResolveError, Resolver};
use crate::RawPathway;

/// Counters for one pathway's unification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnifyStats {
    pub resolved: u32,
    pub unresolved: u32,
    /// Entities folded into another entity's identity.
    pub merged: u32,
}

/// Resolve identifiers and merge co-identified entities in place.
pub fn unify(mut raw: RawPathway, resolver: &dyn Resolver) -> (RawPathway, UnifyStats) {
    let mut stats = UnifyStats::default();
    let pathway_id = raw.metadata.id.clone();

    for entity in &mut raw.entities {
        resolve_entity(entity, resolver, &pathway_id, &mut stats);
    }

    let rewrites = merge_plan(&raw.entities);
    if !rewrites.is_empty() {
        apply_merges(&mut raw, &rewrites, &mut stats);
    }

    (raw, stats)
}

fn resolve_entity(
    entity: &mut Entity,
    resolver: &dyn Resolver,
    pathway_id: &str,
    stats: &mut UnifyStats,
) {
    let ordered: Vec<(Namespace, String)> = entity
        .xrefs_by_priority()
        .into_iter()
        .map(|x| (x.namespace.clone(), x.id.clone()))
        .collect();

    for (namespace, raw_id) in ordered {
        match resolver.resolve(&namespace, &raw_id) {
            Ok(resolved) => {
                if !resolved.name.is_empty() {
                    entity.label = resolved.name.clone();
                }
                entity.resolution = Resolution::Resolved {
                    namespace: resolved.namespace,
                    id: resolved.id,
                    name: resolved.name,
                };
                stats.resolved += 1;
                return;
            }
            Err(ResolveError::Unresolved { .. }) => {
                debug!(pathway = pathway_id, entity = %entity.id, %namespace, %raw_id, "identifier not resolved");
            }
            Err(err @ ResolveError::Backend { .. }) => {
                warn!(pathway = pathway_id, entity = %entity.id, error = %err, "resolver backend degraded; keeping raw identifier");
            }
        }
    }

    entity.resolution = Resolution::Unresolved;
    stats.unresolved += 1;
}

/// Map from each merged-away entity id to its surviving representative.
fn merge_plan(entities: &[Entity]) -> HashMap<EntityId, EntityId> {
    let mut groups: HashMap<(Namespace, String), Vec<EntityId>> = HashMap::new();

    for entity in entities {
        if let Resolution::Resolved { namespace, id, .. } = &entity.resolution {
            groups
                .entry((namespace.clone(), id.clone()))
                .or_default()
                .push(entity.id.clone());
        }
    }

    let mut rewrites = HashMap::new();
    for (_, mut ids) in groups {
        if ids.len() < 2 {
            continue;
        }
        ids.sort();
        let representative = ids[0].clone();
        for id in ids.into_iter().skip(1) {
            rewrites.insert(id, representative.clone());
        }
    }
    rewrites
}

fn apply_merges(
    raw: &mut RawPathway,
    rewrites: &HashMap<EntityId, EntityId>,
    stats: &mut UnifyStats,
) {
    // Accumulate merged attribute sets per representative.
    let mut extra_xrefs: HashMap<EntityId, BTreeSet<crate::model::Xref>> = HashMap::new();
    let mut extra_members: HashMap<EntityId, BTreeSet<EntityId>> = HashMap::new();

    for entity in &raw.entities {
        if let Some(rep) = rewrites.get(&entity.id) {
            extra_xrefs
                .entry(rep.clone())
                .or_default()
                .extend(entity.xrefs.iter().cloned());
            extra_members
                .entry(rep.clone())
                .or_default()
                .extend(entity.members.iter().cloned());
            stats.merged += 1;
        }
    }

    raw.entities.retain(|e| !rewrites.contains_key(&e.id));

    for entity in &mut raw.entities {
        if let Some(xrefs) = extra_xrefs.remove(&entity.id) {
            let mut all: BTreeSet<crate::model::Xref> = entity.xrefs.iter().cloned().collect();
            all.extend(xrefs);
            entity.xrefs = all.into_iter().collect();
        }
        if let Some(members) = extra_members.remove(&entity.id) {
            let mut all: BTreeSet<EntityId> = entity.members.iter().cloned().collect();
            all.extend(members);
            entity.members = all.into_iter().collect();
        }
        // Member lists may point at merged-away ids regardless of whether
        // this entity itself absorbed anything.
        for member in &mut entity.members {
            if let Some(rep) = rewrites.get(member) {
                *member = rep.clone();
            }
        }
        entity.members.dedup();
    }

    let mut seen = HashSet::new();
    let mut rewritten = Vec::with_capacity(raw.relationships.len());
    for mut rel in std::mem::take(&mut raw.relationships) {
        if let Some(rep) = rewrites.get(&rel.source) {
            rel.source = rep.clone();
        }
        if let Some(rep) = rewrites.get(&rel.target) {
            rel.target = rep.clone();
        }
        if seen.insert(rel.clone()) {
            rewritten.push(rel);
        }
    }
    raw.relationships = rewritten;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        EntityKind, PathwayMetadata, Provenance, RelationKind, Relationship, SourceDb, Xref,
    };
    use crate::resolve::{MapResolver, NullResolver, ResolvedId};

    fn sample_pathway(entities: Vec<Entity>, relationships: Vec<Relationship>) -> RawPathway {
        RawPathway {
            metadata: PathwayMetadata::new("wp:test", SourceDb::WikiPathways, "Test"),
            entities,
            relationships,
            skipped: 0,
        }
    }

    fn aldh2() -> ResolvedId {
        ResolvedId {
            namespace: Namespace::Hgnc,
            id: "404".to_string(),
            name: "ALDH2".to_string(),
        }
    }

    fn hgnc_resolver() -> MapResolver {
        let mut resolver = MapResolver::new();
        resolver.insert(Namespace::Entrez, "217", aldh2());
        resolver.insert(Namespace::Uniprot, "P05091", aldh2());
        resolver
    }

    fn aldh2_by_entrez(id: &str) -> Entity {
        Entity::new(id, EntityKind::Gene, "aldh2", SourceDb::WikiPathways)
            .with_xref(Xref::new(Namespace::Entrez, "217"))
    }

    fn aldh2_by_uniprot(id: &str) -> Entity {
        Entity::new(id, EntityKind::Protein, "ALDH2_HUMAN", SourceDb::WikiPathways)
            .with_xref(Xref::new(Namespace::Uniprot, "P05091"))
    }

    #[test]
    fn entities_with_same_canonical_id_merge() {
        let resolver = hgnc_resolver();
        let provenance = Provenance::new(SourceDb::WikiPathways, "wp:test");
        let raw = sample_pathway(
            vec![
                aldh2_by_entrez("a"),
                aldh2_by_uniprot("b"),
                Entity::new("c", EntityKind::Chemical, "acetate", SourceDb::WikiPathways),
            ],
            vec![
                Relationship::directed("b", "c", RelationKind::Increases, provenance.clone()),
                Relationship::directed("a", "c", RelationKind::Increases, provenance),
            ],
        );

        let (unified, stats) = unify(raw, &resolver);

        assert_eq!(stats.merged, 1);
        assert_eq!(unified.entities.len(), 2);
        let survivor = &unified.entities[0];
        assert_eq!(survivor.id, EntityId::new("a"));
        assert_eq!(survivor.label, "ALDH2");
        // Xref sets union across the merged pair.
        assert!(survivor.xrefs.contains(&Xref::new(Namespace::Entrez, "217")));
        assert!(survivor.xrefs.contains(&Xref::new(Namespace::Uniprot, "P05091")));
        // Both edges collapse onto the representative and dedup.
        assert_eq!(unified.relationships.len(), 1);
        assert_eq!(unified.relationships[0].source, EntityId::new("a"));
    }

    #[test]
    fn merge_is_order_independent() {
        let resolver = hgnc_resolver();
        let forward = sample_pathway(vec![aldh2_by_entrez("a"), aldh2_by_uniprot("b")], vec![]);
        let backward = sample_pathway(vec![aldh2_by_uniprot("b"), aldh2_by_entrez("a")], vec![]);

        let (u1, _) = unify(forward, &resolver);
        let (u2, _) = unify(backward, &resolver);

        assert_eq!(u1.entities, u2.entities);
    }

    #[test]
    fn unresolved_entities_are_retained() {
        let raw = sample_pathway(vec![aldh2_by_entrez("a")], vec![]);
        let (unified, stats) = unify(raw, &NullResolver);

        assert_eq!(stats.unresolved, 1);
        assert_eq!(unified.entities.len(), 1);
        assert_eq!(unified.entities[0].resolution, Resolution::Unresolved);
        // The raw xref stays on the entity.
        assert_eq!(unified.entities[0].xrefs.len(), 1);
    }

    #[test]
    fn member_lists_are_rewritten_to_the_representative() {
        let resolver = hgnc_resolver();
        let complex = Entity::new("cx", EntityKind::Complex, "complex", SourceDb::WikiPathways)
            .with_members(vec![EntityId::new("b")]);
        let raw = sample_pathway(vec![aldh2_by_entrez("a"), aldh2_by_uniprot("b"), complex], vec![]);

        let (unified, _) = unify(raw, &resolver);

        let complex = unified
            .entities
            .iter()
            .find(|e| e.id == EntityId::new("cx"))
            .unwrap();
        assert_eq!(complex.members, vec![EntityId::new("a")]);
    }
}
