//! Final graph assembly and invariant validation.
//!
//! This is the single choke point between the per-format parsers and any
//! consumer of a [`Pathway`]: everything that reaches an exporter has passed
//! the checks here. Violations reject the whole pathway (pathway-fatal);
//! they are never silently repaired.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::{EntityId, Pathway};
use crate::RawPathway;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("pathway {pathway}: duplicate entity id {id}")]
    DuplicateEntity { pathway: String, id: EntityId },

    #[error("pathway {pathway}: relationship references missing entity {id}")]
    DanglingEdge { pathway: String, id: EntityId },

    #[error("pathway {pathway}: composite {id} lists missing member {member}")]
    MissingMember {
        pathway: String,
        id: EntityId,
        member: EntityId,
    },

    #[error("pathway {pathway}: entity {id} lists itself as a member")]
    SelfContainment { pathway: String, id: EntityId },

    #[error("pathway {pathway}: membership cycle through {id}")]
    MembershipCycle { pathway: String, id: EntityId },
}

/// Validate the graph invariants and freeze the pathway.
pub fn assemble(raw: RawPathway, flattened: bool) -> Result<Pathway, AssembleError> {
    let pathway_id = raw.metadata.id.clone();

    let mut ids: HashSet<&EntityId> = HashSet::with_capacity(raw.entities.len());
    for entity in &raw.entities {
        if !ids.insert(&entity.id) {
            return Err(AssembleError::DuplicateEntity {
                pathway: pathway_id.clone(),
                id: entity.id.clone(),
            });
        }
    }

    for rel in &raw.relationships {
        for endpoint in [&rel.source, &rel.target] {
            if !ids.contains(endpoint) {
                return Err(AssembleError::DanglingEdge {
                    pathway: pathway_id.clone(),
                    id: endpoint.clone(),
                });
            }
        }
    }

    for entity in &raw.entities {
        for member in &entity.members {
            if member == &entity.id {
                return Err(AssembleError::SelfContainment {
                    pathway: pathway_id.clone(),
                    id: entity.id.clone(),
                });
            }
            if !ids.contains(member) {
                return Err(AssembleError::MissingMember {
                    pathway: pathway_id.clone(),
                    id: entity.id.clone(),
                    member: member.clone(),
                });
            }
        }
    }

    check_membership_acyclic(&raw, &pathway_id)?;

    Ok(Pathway {
        metadata: raw.metadata,
        entities: raw.entities,
        relationships: raw.relationships,
        flattened,
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Expanding,
    Done,
}

/// Depth-first walk over member lists with an explicit "currently expanding"
/// marker; revisiting an expanding node is a cycle.
fn check_membership_acyclic(raw: &RawPathway, pathway_id: &str) -> Result<(), AssembleError> {
    let members_of: HashMap<&EntityId, &[EntityId]> = raw
        .entities
        .iter()
        .map(|e| (&e.id, e.members.as_slice()))
        .collect();

    let mut marks: HashMap<&EntityId, Mark> = HashMap::new();

    for root in raw.entities.iter().filter(|e| !e.members.is_empty()) {
        if marks.contains_key(&root.id) {
            continue;
        }

        // (node, next member index) stack; no recursion.
        let mut stack: Vec<(&EntityId, usize)> = vec![(&root.id, 0)];
        marks.insert(&root.id, Mark::Expanding);

        while let Some((node, idx)) = stack.pop() {
            let members = members_of.get(node).copied().unwrap_or(&[]);
            if idx >= members.len() {
                marks.insert(node, Mark::Done);
                continue;
            }
            stack.push((node, idx + 1));

            let child = &members[idx];
            match marks.get(child) {
                Some(Mark::Expanding) => {
                    return Err(AssembleError::MembershipCycle {
                        pathway: pathway_id.to_string(),
                        id: child.clone(),
                    });
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(child, Mark::Expanding);
                    stack.push((child, 0));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Entity, EntityKind, PathwayMetadata, Provenance, RelationKind, Relationship, SourceDb,
    };

    fn raw(entities: Vec<Entity>, relationships: Vec<Relationship>) -> RawPathway {
        RawPathway {
            metadata: PathwayMetadata::new("path:hsa00010", SourceDb::Kegg, "Glycolysis"),
            entities,
            relationships,
            skipped: 0,
        }
    }

    fn gene(id: &str) -> Entity {
        Entity::new(id, EntityKind::Gene, id, SourceDb::Kegg)
    }

    #[test]
    fn accepts_well_formed_graph() {
        let provenance = Provenance::new(SourceDb::Kegg, "path:hsa00010");
        let pathway = assemble(
            raw(
                vec![gene("a"), gene("b")],
                vec![Relationship::directed("a", "b", RelationKind::Increases, provenance)],
            ),
            false,
        )
        .unwrap();

        assert_eq!(pathway.entities().len(), 2);
        assert_eq!(pathway.relationships().len(), 1);
        assert!(!pathway.flattened());
    }

    #[test]
    fn rejects_dangling_edge() {
        let provenance = Provenance::new(SourceDb::Kegg, "path:hsa00010");
        let err = assemble(
            raw(
                vec![gene("a")],
                vec![Relationship::directed("a", "ghost", RelationKind::Increases, provenance)],
            ),
            false,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            AssembleError::DanglingEdge { ref id, .. } if id.as_str() == "ghost"
        ));
    }

    #[test]
    fn rejects_self_containment() {
        let complex = Entity::new("cx", EntityKind::Complex, "cx", SourceDb::Kegg)
            .with_members(vec![EntityId::new("cx")]);
        let err = assemble(raw(vec![complex], vec![]), false).unwrap_err();

        assert!(matches!(err, AssembleError::SelfContainment { .. }));
    }

    #[test]
    fn rejects_membership_cycle() {
        let c1 = Entity::new("c1", EntityKind::Complex, "c1", SourceDb::Kegg)
            .with_members(vec![EntityId::new("c2")]);
        let c2 = Entity::new("c2", EntityKind::Complex, "c2", SourceDb::Kegg)
            .with_members(vec![EntityId::new("c1")]);
        let err = assemble(raw(vec![c1, c2], vec![]), false).unwrap_err();

        assert!(matches!(err, AssembleError::MembershipCycle { .. }));
    }

    #[test]
    fn rejects_missing_member() {
        let complex = Entity::new("cx", EntityKind::Complex, "cx", SourceDb::Kegg)
            .with_members(vec![EntityId::new("ghost")]);
        let err = assemble(raw(vec![complex], vec![]), false).unwrap_err();

        assert!(matches!(err, AssembleError::MissingMember { .. }));
    }

    #[test]
    fn rejects_duplicate_entity_ids() {
        let err = assemble(raw(vec![gene("a"), gene("a")], vec![]), false).unwrap_err();
        assert!(matches!(err, AssembleError::DuplicateEntity { .. }));
    }
}
