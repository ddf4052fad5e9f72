//! KGML (KEGG pathway diagram XML) ingestion for pathweave.
//!
//! One KGML document describes one pathway diagram: `entry` nodes (gene
//! products, compounds, pathway maps, groups), `relation` edges with typed
//! subtypes, and `reaction` elements tying substrates and products to the
//! catalyzing gene entry.
//!
//! Composite handling is governed by the `flatten` option:
//! - unflattened, a `group` entry (and a multi-id gene entry) becomes one
//!   composite entity with `HasComponent` edges to its members;
//! - flattened, the composite disappears and every relationship touching it
//!   is rewritten onto the members, expanding over the full cartesian product
//!   when both ends are composite.

pub mod parser;

use std::collections::HashMap;

use tracing::{debug, warn};

use pathweave_graph::{
    ConvertOptions, Entity, EntityId, EntityKind, ParseError, PathwayMetadata, PathwaySource,
    Provenance, RawPathway, RelationKind, Relationship, SourceDb, Xref, KEGG_CITATION,
    Namespace,
};

use parser::{parse_kgml, KgmlDocument, KgmlEntry, KgmlReaction, KgmlRelation};

/// [`PathwaySource`] implementation for KGML documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct KgmlSource;

impl PathwaySource for KgmlSource {
    fn database(&self) -> SourceDb {
        SourceDb::Kegg
    }

    fn parse(&self, text: &str, options: &ConvertOptions) -> Result<Vec<RawPathway>, ParseError> {
        let doc = parse_kgml(text)?;
        Ok(vec![convert_document(doc, options.flatten)?])
    }
}

// ============================================================================
// Relation subtype mapping
// ============================================================================

enum SubtypeMapping {
    Kind(RelationKind),
    /// Subtypes the conversion deliberately does not carry over.
    Omitted,
    Unknown,
}

/// Fixed lookup from KGML relation subtypes into the shared vocabulary.
fn map_subtype(name: &str) -> SubtypeMapping {
    match name {
        "activation" | "expression" | "phosphorylation" | "glycosylation" | "ubiquitination"
        | "methylation" => SubtypeMapping::Kind(RelationKind::Increases),
        "inhibition" | "repression" | "dephosphorylation" => {
            SubtypeMapping::Kind(RelationKind::Decreases)
        }
        "binding/association" | "compound" => SubtypeMapping::Kind(RelationKind::Binding),
        "indirect effect" => SubtypeMapping::Kind(RelationKind::Association),
        "dissociation" | "hidden compound" | "missing interaction" | "state change" => {
            SubtypeMapping::Omitted
        }
        _ => SubtypeMapping::Unknown,
    }
}

fn is_undirected(kind: RelationKind) -> bool {
    matches!(kind, RelationKind::Binding | RelationKind::Association)
}

// ============================================================================
// Document conversion
// ============================================================================

struct Converter {
    flatten: bool,
    pathway_id: String,
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
    /// Diagram entry id → graph entity ids it stands for. A flattened
    /// composite maps to all of its leaves; everything else maps to one id.
    endpoints: HashMap<String, Vec<EntityId>>,
    skipped: u32,
}

fn convert_document(doc: KgmlDocument, flatten: bool) -> Result<RawPathway, ParseError> {
    let mut metadata = PathwayMetadata::new(doc.name.clone(), SourceDb::Kegg, doc.title.clone());
    metadata.organism = Some(doc.org.clone()).filter(|s| !s.is_empty());
    metadata.description = Some(doc.link.clone()).filter(|s| !s.is_empty());

    let mut converter = Converter {
        flatten,
        pathway_id: doc.name.clone(),
        entities: Vec::new(),
        relationships: Vec::new(),
        endpoints: HashMap::new(),
        skipped: doc.skipped,
    };

    converter.add_simple_entries(&doc)?;
    converter.add_groups(&doc)?;

    for relation in &doc.relations {
        converter.add_relation_edges(relation);
    }
    for reaction in &doc.reactions {
        converter.add_reaction_edges(reaction);
    }

    Ok(RawPathway {
        metadata,
        entities: converter.entities,
        relationships: converter.relationships,
        skipped: converter.skipped,
    })
}

impl Converter {
    fn provenance(&self) -> Provenance {
        Provenance::new(SourceDb::Kegg, self.pathway_id.clone()).with_citation(KEGG_CITATION)
    }

    /// First pass: every non-group entry becomes one entity (or a family of
    /// leaves when the diagram node stands for several gene products).
    fn add_simple_entries(&mut self, doc: &KgmlDocument) -> Result<(), ParseError> {
        for entry in &doc.entries {
            let kind = match entry.entry_type.as_str() {
                "gene" | "ortholog" => EntityKind::Gene,
                "compound" => EntityKind::Chemical,
                "map" => EntityKind::BiologicalProcess,
                "group" => continue,
                other => {
                    debug!(pathway = %self.pathway_id, entry = %entry.id, entry_type = other, "entry type not converted");
                    continue;
                }
            };

            if entry.names.is_empty() {
                warn!(pathway = %self.pathway_id, entry = %entry.id, "entry has no identifier; dropped");
                self.skipped += 1;
                continue;
            }

            if entry.names.len() == 1 || kind == EntityKind::BiologicalProcess {
                let entity = self.leaf_entity(entry.id.clone(), kind, entry, &entry.names[0]);
                self.endpoints
                    .insert(entry.id.clone(), vec![entity.id.clone()]);
                self.entities.push(entity);
            } else {
                self.add_family(entry, kind);
            }
        }
        Ok(())
    }

    fn leaf_entity(&self, id: String, kind: EntityKind, entry: &KgmlEntry, kegg_id: &str) -> Entity {
        let label = display_label(entry, kegg_id);
        Entity::new(id, kind, label, SourceDb::Kegg)
            .with_xref(Xref::new(Namespace::Kegg, kegg_id))
    }

    /// A multi-id diagram node: one leaf per KEGG id, grouped as a `Family`
    /// unless flattening is on.
    fn add_family(&mut self, entry: &KgmlEntry, kind: EntityKind) {
        let mut leaf_ids = Vec::with_capacity(entry.names.len());
        for (i, kegg_id) in entry.names.iter().enumerate() {
            let leaf = Entity::new(
                format!("{}.{}", entry.id, i + 1),
                kind,
                kegg_id.clone(),
                SourceDb::Kegg,
            )
            .with_xref(Xref::new(Namespace::Kegg, kegg_id));
            leaf_ids.push(leaf.id.clone());
            self.entities.push(leaf);
        }

        if self.flatten {
            self.endpoints.insert(entry.id.clone(), leaf_ids);
            return;
        }

        let family = Entity::new(
            entry.id.clone(),
            EntityKind::Family,
            display_label(entry, &entry.names.join(" ")),
            SourceDb::Kegg,
        )
        .with_members(leaf_ids.clone());
        for member in &leaf_ids {
            self.relationships.push(Relationship::directed(
                family.id.clone(),
                member.clone(),
                RelationKind::HasComponent,
                self.provenance(),
            ));
        }
        self.endpoints
            .insert(entry.id.clone(), vec![family.id.clone()]);
        self.entities.push(family);
    }

    /// Second pass: `group` entries, which reference other entries by id.
    fn add_groups(&mut self, doc: &KgmlDocument) -> Result<(), ParseError> {
        let groups: HashMap<&str, &KgmlEntry> = doc
            .entries
            .iter()
            .filter(|e| e.entry_type == "group")
            .map(|e| (e.id.as_str(), e))
            .collect();

        if self.flatten {
            let mut cache: HashMap<String, Vec<EntityId>> = HashMap::new();
            for entry in doc.entries.iter().filter(|e| e.entry_type == "group") {
                let mut expanding = Vec::new();
                let leaves = self.expand_group(entry, &groups, &mut expanding, &mut cache)?;
                self.endpoints.insert(entry.id.clone(), leaves);
            }
            return Ok(());
        }

        for entry in doc.entries.iter().filter(|e| e.entry_type == "group") {
            let mut members = Vec::new();
            for component in &entry.components {
                if groups.contains_key(component.as_str()) {
                    // Nested group: reference its complex entity directly.
                    members.push(EntityId::new(component.clone()));
                } else if let Some(ids) = self.endpoints.get(component) {
                    members.extend(ids.iter().cloned());
                } else {
                    warn!(pathway = %self.pathway_id, group = %entry.id, component = %component, "group component not found; dropped");
                    self.skipped += 1;
                }
            }

            let complex = Entity::new(
                entry.id.clone(),
                EntityKind::Complex,
                display_label(entry, "complex"),
                SourceDb::Kegg,
            )
            .with_members(members.clone());
            for member in &members {
                self.relationships.push(Relationship::directed(
                    complex.id.clone(),
                    member.clone(),
                    RelationKind::HasComponent,
                    self.provenance(),
                ));
            }
            self.endpoints
                .insert(entry.id.clone(), vec![complex.id.clone()]);
            self.entities.push(complex);
        }
        Ok(())
    }

    /// Resolve a group to its leaf entity ids, following nested groups.
    /// Membership cycles are pathway-fatal rather than unbounded recursion.
    fn expand_group(
        &mut self,
        entry: &KgmlEntry,
        groups: &HashMap<&str, &KgmlEntry>,
        expanding: &mut Vec<String>,
        cache: &mut HashMap<String, Vec<EntityId>>,
    ) -> Result<Vec<EntityId>, ParseError> {
        if let Some(cached) = cache.get(&entry.id) {
            return Ok(cached.clone());
        }
        if expanding.contains(&entry.id) {
            return Err(ParseError::malformed(
                "kgml",
                format!("group membership cycle through entry {}", entry.id),
            ));
        }
        expanding.push(entry.id.clone());

        let mut leaves = Vec::new();
        for component in &entry.components {
            if let Some(nested) = groups.get(component.as_str()) {
                leaves.extend(self.expand_group(nested, groups, expanding, cache)?);
            } else if let Some(ids) = self.endpoints.get(component) {
                leaves.extend(ids.iter().cloned());
            } else {
                warn!(pathway = %self.pathway_id, group = %entry.id, component = %component, "group component not found; dropped");
                self.skipped += 1;
            }
        }

        expanding.pop();
        cache.insert(entry.id.clone(), leaves.clone());
        Ok(leaves)
    }

    fn add_relation_edges(&mut self, relation: &KgmlRelation) {
        if relation.subtypes.is_empty() {
            warn!(pathway = %self.pathway_id, entry1 = %relation.entry1, entry2 = %relation.entry2, "relation without subtype; dropped");
            self.skipped += 1;
            return;
        }

        for (subtype, value) in &relation.subtypes {
            match relation.relation_type.as_str() {
                // Protein-protein, protein-compound and TF-target relations.
                "PPrel" | "PCrel" | "GErel" => match map_subtype(subtype) {
                    SubtypeMapping::Kind(kind) => {
                        self.add_edges(&relation.entry1, &relation.entry2, kind);
                    }
                    SubtypeMapping::Omitted => {
                        debug!(pathway = %self.pathway_id, subtype = %subtype, "relation subtype deliberately not converted");
                    }
                    SubtypeMapping::Unknown => {
                        warn!(pathway = %self.pathway_id, subtype = %subtype, "unknown relation kind; edge dropped");
                        self.skipped += 1;
                    }
                },
                // Enzyme-enzyme relations bind through their shared compound.
                "ECrel" => {
                    self.add_edges(&relation.entry1, &relation.entry2, RelationKind::Binding);
                    if !value.is_empty() && self.endpoints.contains_key(value) {
                        self.add_edges(&relation.entry1, value, RelationKind::Binding);
                        self.add_edges(value, &relation.entry2, RelationKind::Binding);
                    }
                }
                // Links into another pathway map.
                "maplink" => {
                    self.add_edges(&relation.entry1, &relation.entry2, RelationKind::Binding);
                }
                other => {
                    warn!(pathway = %self.pathway_id, relation_type = other, "unknown relation type; edge dropped");
                    self.skipped += 1;
                }
            }
        }
    }

    fn add_reaction_edges(&mut self, reaction: &KgmlReaction) {
        let substrates = self.reaction_participants(&reaction.substrates, reaction);
        let products = self.reaction_participants(&reaction.products, reaction);
        if substrates.is_empty() || products.is_empty() {
            debug!(pathway = %self.pathway_id, reaction = %reaction.name, "reaction without resolvable substrates/products");
            return;
        }

        let provenance = self.provenance().with_origin(reaction.name.clone());
        for substrate in &substrates {
            for product in &products {
                self.relationships.push(Relationship::directed(
                    substrate.clone(),
                    product.clone(),
                    RelationKind::Increases,
                    provenance.clone(),
                ));
                if reaction.reaction_type == "reversible" {
                    self.relationships.push(Relationship::directed(
                        product.clone(),
                        substrate.clone(),
                        RelationKind::Increases,
                        provenance.clone(),
                    ));
                }
            }
        }

        // The reaction id names the catalyzing gene entry.
        match self.endpoints.get(&reaction.id) {
            Some(enzymes) => {
                let enzymes = enzymes.clone();
                for enzyme in &enzymes {
                    for product in &products {
                        self.relationships.push(Relationship::directed(
                            enzyme.clone(),
                            product.clone(),
                            RelationKind::Catalysis,
                            provenance.clone(),
                        ));
                    }
                }
            }
            None => {
                debug!(pathway = %self.pathway_id, reaction = %reaction.name, "no catalyzing entry for reaction");
            }
        }
    }

    fn reaction_participants(&mut self, entry_ids: &[String], reaction: &KgmlReaction) -> Vec<EntityId> {
        let mut out = Vec::new();
        for entry_id in entry_ids {
            match self.endpoints.get(entry_id) {
                Some(ids) => out.extend(ids.iter().cloned()),
                None => {
                    warn!(pathway = %self.pathway_id, reaction = %reaction.name, entry = %entry_id, "reaction participant not found; dropped");
                    self.skipped += 1;
                }
            }
        }
        out
    }

    /// Emit one relationship per (source, target) endpoint pair. When either
    /// end is a flattened composite this is the cartesian expansion over its
    /// membership, over both memberships when both ends are composite.
    fn add_edges(&mut self, source_entry: &str, target_entry: &str, kind: RelationKind) {
        let (Some(sources), Some(targets)) = (
            self.endpoints.get(source_entry).cloned(),
            self.endpoints.get(target_entry).cloned(),
        ) else {
            debug!(pathway = %self.pathway_id, source = %source_entry, target = %target_entry, "relation endpoint not converted; edge dropped");
            self.skipped += 1;
            return;
        };

        let provenance = self.provenance();

        for source in &sources {
            for target in &targets {
                let relationship = if is_undirected(kind) {
                    Relationship::undirected(source.clone(), target.clone(), kind, provenance.clone())
                } else {
                    Relationship::directed(source.clone(), target.clone(), kind, provenance.clone())
                };
                self.relationships.push(relationship);
            }
        }
    }
}

fn display_label(entry: &KgmlEntry, fallback: &str) -> String {
    match &entry.graphics_name {
        Some(name) if !name.is_empty() => {
            let name = name.strip_prefix("TITLE:").unwrap_or(name).trim();
            name.trim_end_matches("...").to_string()
        }
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathweave_graph::Resolution;

    /// Group 20 holds genes 10 and 11; an activation points from the group
    /// at compound 12.
    const GROUPED: &str = r#"<?xml version="1.0"?>
<pathway name="path:hsa04110" org="hsa" title="Cell cycle" link="https://www.kegg.jp/pathway/hsa04110">
  <entry id="10" name="hsa:595" type="gene"><graphics name="CCND1"/></entry>
  <entry id="11" name="hsa:1019" type="gene"><graphics name="CDK4"/></entry>
  <entry id="12" name="cpd:C00076" type="compound"><graphics name="C00076"/></entry>
  <entry id="20" name="undefined" type="group">
    <component id="10"/>
    <component id="11"/>
  </entry>
  <relation entry1="20" entry2="12" type="PPrel">
    <subtype name="activation" value="--&gt;"/>
  </relation>
</pathway>
"#;

    fn parse(text: &str, flatten: bool) -> RawPathway {
        let mut pathways = KgmlSource
            .parse(text, &ConvertOptions { flatten })
            .unwrap();
        assert_eq!(pathways.len(), 1);
        pathways.remove(0)
    }

    #[test]
    fn unflattened_group_becomes_complex_with_component_edges() {
        let raw = parse(GROUPED, false);

        let complex = raw
            .entities
            .iter()
            .find(|e| e.id == EntityId::new("20"))
            .expect("group entity");
        assert_eq!(complex.kind, EntityKind::Complex);
        assert_eq!(
            complex.members,
            vec![EntityId::new("10"), EntityId::new("11")]
        );

        let component_edges: Vec<_> = raw
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::HasComponent)
            .collect();
        assert_eq!(component_edges.len(), 2);

        // The pathway-level relationship touches the group as one unit.
        let increases: Vec<_> = raw
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::Increases)
            .collect();
        assert_eq!(increases.len(), 1);
        assert_eq!(increases[0].source, EntityId::new("20"));
        assert_eq!(increases[0].target, EntityId::new("12"));
        assert!(raw.entities.iter().all(|e| e.resolution == Resolution::Unresolved));
    }

    #[test]
    fn flattened_group_rewrites_relationships_onto_members() {
        let raw = parse(GROUPED, true);

        assert!(raw.entities.iter().all(|e| e.id != EntityId::new("20")));
        assert!(raw
            .relationships
            .iter()
            .all(|r| r.kind != RelationKind::HasComponent));

        let mut increases: Vec<(String, String)> = raw
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::Increases)
            .map(|r| (r.source.to_string(), r.target.to_string()))
            .collect();
        increases.sort();
        assert_eq!(
            increases,
            vec![
                ("10".to_string(), "12".to_string()),
                ("11".to_string(), "12".to_string()),
            ]
        );
    }

    #[test]
    fn relation_between_two_groups_expands_over_both_memberships() {
        let text = r#"<pathway name="path:hsa1" org="hsa" title="t" link="l">
  <entry id="1" name="hsa:1" type="gene"/>
  <entry id="2" name="hsa:2" type="gene"/>
  <entry id="3" name="hsa:3" type="gene"/>
  <entry id="4" name="hsa:4" type="gene"/>
  <entry id="8" name="undefined" type="group"><component id="1"/><component id="2"/></entry>
  <entry id="9" name="undefined" type="group"><component id="3"/><component id="4"/></entry>
  <relation entry1="8" entry2="9" type="PPrel"><subtype name="inhibition" value="--|"/></relation>
</pathway>"#;
        let raw = parse(text, true);

        let decreases: Vec<_> = raw
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::Decreases)
            .collect();
        assert_eq!(decreases.len(), 4);
    }

    #[test]
    fn unknown_relation_subtype_is_skipped_not_fatal() {
        let text = r#"<pathway name="path:hsa1" org="hsa" title="t" link="l">
  <entry id="1" name="hsa:1" type="gene"/>
  <entry id="2" name="hsa:2" type="gene"/>
  <relation entry1="1" entry2="2" type="PPrel"><subtype name="quantum entanglement" value="?"/></relation>
</pathway>"#;
        let raw = parse(text, false);

        assert!(raw.relationships.is_empty());
        assert_eq!(raw.skipped, 1);
    }

    #[test]
    fn multi_id_entry_becomes_family_of_leaves() {
        let text = r#"<pathway name="path:hsa1" org="hsa" title="t" link="l">
  <entry id="5" name="hsa:5595 hsa:5594" type="gene"><graphics name="MAPK1..."/></entry>
</pathway>"#;
        let raw = parse(text, false);

        let family = raw
            .entities
            .iter()
            .find(|e| e.id == EntityId::new("5"))
            .expect("family entity");
        assert_eq!(family.kind, EntityKind::Family);
        assert_eq!(family.label, "MAPK1");
        assert_eq!(
            family.members,
            vec![EntityId::new("5.1"), EntityId::new("5.2")]
        );
        assert_eq!(
            raw.relationships
                .iter()
                .filter(|r| r.kind == RelationKind::HasComponent)
                .count(),
            2
        );
    }

    #[test]
    fn reversible_reaction_produces_both_directions_and_catalysis() {
        let text = r#"<pathway name="path:hsa00010" org="hsa" title="t" link="l">
  <entry id="1" name="hsa:217" type="gene"><graphics name="ALDH2"/></entry>
  <entry id="2" name="cpd:C00084" type="compound"/>
  <entry id="3" name="cpd:C00033" type="compound"/>
  <reaction id="1" name="rn:R00710" type="reversible">
    <substrate id="2" name="cpd:C00084"/>
    <product id="3" name="cpd:C00033"/>
  </reaction>
</pathway>"#;
        let raw = parse(text, false);

        let increases: Vec<_> = raw
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::Increases)
            .collect();
        assert_eq!(increases.len(), 2);
        assert!(increases
            .iter()
            .all(|r| r.provenance.origin.as_deref() == Some("rn:R00710")));

        let catalysis: Vec<_> = raw
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::Catalysis)
            .collect();
        assert_eq!(catalysis.len(), 1);
        assert_eq!(catalysis[0].source, EntityId::new("1"));
        assert_eq!(catalysis[0].target, EntityId::new("3"));
    }

    #[test]
    fn map_entries_become_biological_processes() {
        let text = r#"<pathway name="path:hsa1" org="hsa" title="t" link="l">
  <entry id="7" name="path:hsa00020" type="map"><graphics name="TITLE:Citrate cycle"/></entry>
</pathway>"#;
        let raw = parse(text, false);

        assert_eq!(raw.entities.len(), 1);
        assert_eq!(raw.entities[0].kind, EntityKind::BiologicalProcess);
        assert_eq!(raw.entities[0].label, "Citrate cycle");
    }

    #[test]
    fn metadata_carries_title_organism_and_link() {
        let raw = parse(GROUPED, false);
        assert_eq!(raw.metadata.id, "path:hsa04110");
        assert_eq!(raw.metadata.title, "Cell cycle");
        assert_eq!(raw.metadata.organism.as_deref(), Some("hsa"));
        assert!(raw.metadata.description.as_deref().unwrap().contains("kegg.jp"));
    }
}
