//! BioPAX level 3 (reaction-network RDF) ingestion for pathweave.
//!
//! The source serialization is one huge RDF/XML document describing the
//! entire corpus: physical entities, biochemical reactions, and
//! catalysis/regulation statements, with pathways tying reactions together
//! through `bp:pathwayComponent`.
//!
//! The triple graph is consumed in a single streaming pass that folds each
//! statement into a per-subject record; nothing resembling the cross-product
//! of all pathways is ever materialized. Per-pathway subgraphs are then
//! extracted by walking `pathwayComponent` membership from each `bp:Pathway`
//! subject.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::convert::Infallible;

use sophia::api::prelude::*;
use tracing::{debug, warn};

use pathweave_graph::{
    ConvertOptions, Entity, EntityId, EntityKind, Namespace, ParseError, PathwayMetadata,
    PathwaySource, Provenance, RawPathway, RelationKind, Relationship, SourceDb, Xref,
    REACTOME_CITATION,
};

pub const BIOPAX_NS: &str = "http://www.biopax.org/release/biopax-level3.owl#";
pub const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// [`PathwaySource`] implementation for BioPAX RDF/XML documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct BiopaxSource;

impl PathwaySource for BiopaxSource {
    fn database(&self) -> SourceDb {
        SourceDb::Reactome
    }

    fn parse(&self, text: &str, _options: &ConvertOptions) -> Result<Vec<RawPathway>, ParseError> {
        let records = fold_statements(text)?;
        pathways_from_records(&records)
    }
}

// ============================================================================
// RDF term model (display-form parsing, enough for statement folding)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Iri(String),
    Blank(String),
    Literal(String),
}

fn unescape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_term(term: &str) -> Term {
    let s = term.trim();
    if let Some(iri) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Term::Iri(iri.to_string());
    }
    if let Some(bnode) = s.strip_prefix("_:") {
        return Term::Blank(bnode.to_string());
    }
    if let Some(rest) = s.strip_prefix('"') {
        // Language tags and datatypes trail the closing quote; drop them.
        if let Some(end) = rest.rfind('"') {
            return Term::Literal(unescape_literal(&rest[..end]));
        }
    }
    Term::Literal(s.to_string())
}

fn local_name(iri: &str) -> String {
    iri.rsplit(['#', '/']).next().unwrap_or(iri).to_string()
}

// ============================================================================
// Statement folding (single streaming pass)
// ============================================================================

/// Everything this parser needs to know about one triple subject.
#[derive(Debug, Default, Clone)]
struct SubjectRecord {
    /// BioPAX class local names from `rdf:type`.
    types: BTreeSet<String>,
    display_name: Option<String>,
    names: Vec<String>,
    comments: Vec<String>,
    lefts: Vec<String>,
    rights: Vec<String>,
    controllers: Vec<String>,
    controlled: Vec<String>,
    control_type: Option<String>,
    components: Vec<String>,
    xrefs: Vec<String>,
    entity_references: Vec<String>,
    /// `bp:db` / `bp:id` literals (set on xref subjects).
    db: Option<String>,
    id: Option<String>,
    organisms: Vec<String>,
    pathway_components: Vec<String>,
}

fn fold_statements(text: &str) -> Result<BTreeMap<String, SubjectRecord>, ParseError> {
    let cursor = std::io::Cursor::new(text.as_bytes().to_vec());
    let reader = std::io::BufReader::new(cursor);
    let mut parser = sophia::xml::parser::parse_bufread(reader);

    let mut records: BTreeMap<String, SubjectRecord> = BTreeMap::new();

    parser
        .try_for_each_triple(|t| -> Result<(), Infallible> {
            let subject = match parse_term(&t.s().to_string()) {
                Term::Iri(iri) => iri,
                Term::Blank(bnode) => format!("_:{bnode}"),
                Term::Literal(_) => return Ok(()),
            };
            let Term::Iri(predicate) = parse_term(&t.p().to_string()) else {
                return Ok(());
            };
            let object = parse_term(&t.o().to_string());

            fold_statement(&mut records, subject, &predicate, object);
            Ok(())
        })
        .map_err(|e| ParseError::malformed("biopax", e.to_string()))?;

    Ok(records)
}

fn fold_statement(
    records: &mut BTreeMap<String, SubjectRecord>,
    subject: String,
    predicate: &str,
    object: Term,
) {
    if predicate == RDF_TYPE_IRI {
        if let Term::Iri(class_iri) = object {
            if class_iri.starts_with(BIOPAX_NS) {
                records
                    .entry(subject)
                    .or_default()
                    .types
                    .insert(local_name(&class_iri));
            }
        }
        return;
    }

    if !predicate.starts_with(BIOPAX_NS) {
        return;
    }

    let record = records.entry(subject).or_default();
    match (local_name(predicate).as_str(), object) {
        ("displayName", Term::Literal(v)) => {
            record.display_name.get_or_insert(v);
        }
        ("name" | "standardName", Term::Literal(v)) => record.names.push(v),
        ("comment", Term::Literal(v)) => record.comments.push(v),
        ("left", Term::Iri(v)) => record.lefts.push(v),
        ("right", Term::Iri(v)) => record.rights.push(v),
        ("controller", Term::Iri(v)) => record.controllers.push(v),
        ("controlled", Term::Iri(v)) => record.controlled.push(v),
        ("controlType", Term::Literal(v)) => record.control_type = Some(v),
        ("component", Term::Iri(v)) => record.components.push(v),
        ("xref", Term::Iri(v)) => record.xrefs.push(v),
        ("entityReference", Term::Iri(v)) => record.entity_references.push(v),
        ("db", Term::Literal(v)) => record.db = Some(v),
        ("id", Term::Literal(v)) => record.id = Some(v),
        ("organism", Term::Iri(v)) => record.organisms.push(v),
        ("pathwayComponent", Term::Iri(v)) => record.pathway_components.push(v),
        _ => {}
    }
}

// ============================================================================
// BioPAX class → entity kind table
// ============================================================================

/// Fixed type table from the ontology class hierarchy into the shared
/// vocabulary. Unrecognized classes become `Other` instead of failing the
/// pathway.
fn entity_kind(types: &BTreeSet<String>) -> EntityKind {
    if types.contains("Protein") {
        EntityKind::Protein
    } else if types.contains("Dna") || types.contains("DnaRegion") {
        EntityKind::Gene
    } else if types.contains("Rna") || types.contains("RnaRegion") {
        EntityKind::Rna
    } else if types.contains("SmallMolecule") {
        EntityKind::Chemical
    } else if types.contains("Complex") {
        EntityKind::Complex
    } else if types.contains("Pathway") {
        EntityKind::Pathway
    } else {
        EntityKind::Other
    }
}

fn is_reaction(types: &BTreeSet<String>) -> bool {
    types.contains("BiochemicalReaction")
        || types.contains("Transport")
        || types.contains("TransportWithBiochemicalReaction")
        || types.contains("Degradation")
}

fn is_control(types: &BTreeSet<String>) -> bool {
    types.contains("Catalysis")
        || types.contains("Control")
        || types.contains("Modulation")
        || types.contains("TemplateReactionRegulation")
}

// ============================================================================
// Per-pathway extraction
// ============================================================================

fn pathways_from_records(
    records: &BTreeMap<String, SubjectRecord>,
) -> Result<Vec<RawPathway>, ParseError> {
    // Controls point at their reaction; reactions need the reverse direction.
    let mut controls_by_reaction: HashMap<&str, Vec<&str>> = HashMap::new();
    for (iri, record) in records {
        if is_control(&record.types) {
            for controlled in &record.controlled {
                controls_by_reaction
                    .entry(controlled.as_str())
                    .or_default()
                    .push(iri.as_str());
            }
        }
    }

    let mut pathways = Vec::new();
    for (iri, record) in records {
        if record.types.contains("Pathway") {
            let builder = PathwayBuilder {
                records,
                controls_by_reaction: &controls_by_reaction,
                pathway_id: pathway_external_id(iri, record, records),
                entities: Vec::new(),
                added: HashSet::new(),
                relationships: Vec::new(),
                skipped: 0,
            };
            pathways.push(builder.build(iri, record));
        }
    }

    if pathways.is_empty() {
        return Err(ParseError::NoPathway);
    }
    Ok(pathways)
}

/// Prefer the database's own accession (unification xref) over the RDF-local
/// name for the externally visible pathway id.
fn pathway_external_id(
    iri: &str,
    record: &SubjectRecord,
    records: &BTreeMap<String, SubjectRecord>,
) -> String {
    for xref_iri in &record.xrefs {
        if let Some(xref) = records.get(xref_iri) {
            if let (Some(db), Some(id)) = (&xref.db, &xref.id) {
                if Namespace::from_db_label(db) == Namespace::Reactome {
                    return id.clone();
                }
            }
        }
    }
    local_name(iri)
}

struct PathwayBuilder<'a> {
    records: &'a BTreeMap<String, SubjectRecord>,
    controls_by_reaction: &'a HashMap<&'a str, Vec<&'a str>>,
    pathway_id: String,
    entities: Vec<Entity>,
    added: HashSet<String>,
    relationships: Vec<Relationship>,
    skipped: u32,
}

impl<'a> PathwayBuilder<'a> {
    fn build(mut self, pathway_iri: &str, record: &SubjectRecord) -> RawPathway {
        let mut metadata =
            PathwayMetadata::new(self.pathway_id.clone(), SourceDb::Reactome, String::new());
        metadata.title = record
            .display_name
            .clone()
            .or_else(|| record.names.first().cloned())
            .unwrap_or_else(|| local_name(pathway_iri));
        metadata.organism = self.organism_name(record);
        metadata.description =
            Some(record.comments.join("\n")).filter(|s| !s.is_empty());

        for component_iri in &record.pathway_components {
            let Some(component) = self.records.get(component_iri) else {
                warn!(pathway = %self.pathway_id, component = %component_iri, "pathway component not declared; dropped");
                self.skipped += 1;
                continue;
            };
            if is_reaction(&component.types) {
                self.add_reaction(component_iri, component);
            } else if component.types.contains("Pathway") {
                // Sub-pathways stay single nodes; their own conversion
                // happens in their own RawPathway.
                self.ensure_entity(component_iri, &mut Vec::new());
            } else {
                debug!(pathway = %self.pathway_id, component = %component_iri, "pathway component type not converted");
            }
        }

        RawPathway {
            metadata,
            entities: self.entities,
            relationships: self.relationships,
            skipped: self.skipped,
        }
    }

    fn organism_name(&self, record: &SubjectRecord) -> Option<String> {
        let organism_iri = record.organisms.first()?;
        let organism = self.records.get(organism_iri)?;
        organism
            .display_name
            .clone()
            .or_else(|| organism.names.first().cloned())
    }

    fn provenance(&self, origin: &str) -> Provenance {
        Provenance::new(SourceDb::Reactome, self.pathway_id.clone())
            .with_origin(local_name(origin))
            .with_citation(REACTOME_CITATION)
    }

    /// One reaction becomes a cluster of relationships: a directed edge per
    /// (input, output) pair, and one catalysis/inhibition edge per
    /// (controller, output) pair, all tagged with the reaction id.
    fn add_reaction(&mut self, reaction_iri: &str, record: &SubjectRecord) {
        if record.lefts.is_empty() || record.rights.is_empty() {
            warn!(pathway = %self.pathway_id, reaction = %reaction_iri, "reaction missing input or output role; dropped");
            self.skipped += 1;
            return;
        }

        let kind = if record.types.contains("Transport")
            || record.types.contains("TransportWithBiochemicalReaction")
        {
            RelationKind::Translocation
        } else {
            RelationKind::Increases
        };

        let inputs: Vec<EntityId> = record
            .lefts
            .iter()
            .map(|iri| self.ensure_entity(iri, &mut Vec::new()))
            .collect();
        let outputs: Vec<EntityId> = record
            .rights
            .iter()
            .map(|iri| self.ensure_entity(iri, &mut Vec::new()))
            .collect();

        for input in &inputs {
            for output in &outputs {
                self.relationships.push(Relationship::directed(
                    input.clone(),
                    output.clone(),
                    kind,
                    self.provenance(reaction_iri),
                ));
            }
        }

        for control_iri in self
            .controls_by_reaction
            .get(reaction_iri)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
        {
            let Some(control) = self.records.get(*control_iri) else {
                continue;
            };
            if control.controllers.is_empty() {
                warn!(pathway = %self.pathway_id, control = %control_iri, "control statement missing controller role; dropped");
                self.skipped += 1;
                continue;
            }
            let control_kind = match control.control_type.as_deref() {
                Some(ct) if ct.starts_with("INHIBITION") => RelationKind::Inhibition,
                // Catalysis instances default to activation.
                _ => RelationKind::Catalysis,
            };
            for controller_iri in &control.controllers {
                let controller = self.ensure_entity(controller_iri, &mut Vec::new());
                for output in &outputs {
                    self.relationships.push(Relationship::directed(
                        controller.clone(),
                        output.clone(),
                        control_kind,
                        self.provenance(reaction_iri),
                    ));
                }
            }
        }
    }

    /// Add the entity for a subject (once), returning its local id. Complex
    /// membership recurses with an in-progress marker so reference cycles
    /// terminate; the assembler still rejects any cyclic membership left in
    /// the output.
    fn ensure_entity(&mut self, iri: &str, visiting: &mut Vec<String>) -> EntityId {
        let id = EntityId::new(local_name(iri));
        if self.added.contains(iri) || visiting.iter().any(|v| v == iri) {
            return id;
        }
        visiting.push(iri.to_string());

        let Some(record) = self.records.get(iri) else {
            warn!(pathway = %self.pathway_id, entity = %iri, "participant not declared; retained as generic entity");
            self.added.insert(iri.to_string());
            self.entities.push(Entity::new(
                id.clone(),
                EntityKind::Other,
                local_name(iri),
                SourceDb::Reactome,
            ));
            visiting.pop();
            return id;
        };

        let kind = entity_kind(&record.types);
        let label = record
            .display_name
            .clone()
            .or_else(|| record.names.first().cloned())
            .unwrap_or_else(|| local_name(iri));

        let mut entity = Entity::new(id.clone(), kind, label, SourceDb::Reactome);
        for xref in self.collect_xrefs(record) {
            entity = entity.with_xref(xref);
        }

        if kind == EntityKind::Complex {
            let members: Vec<EntityId> = record
                .components
                .iter()
                .map(|component| self.ensure_entity(component, visiting))
                .collect();
            for member in &members {
                self.relationships.push(Relationship::directed(
                    id.clone(),
                    member.clone(),
                    RelationKind::HasComponent,
                    Provenance::new(SourceDb::Reactome, self.pathway_id.clone())
                        .with_citation(REACTOME_CITATION),
                ));
            }
            entity = entity.with_members(members);
        }

        self.added.insert(iri.to_string());
        self.entities.push(entity);
        visiting.pop();
        id
    }

    /// Cross-references live both on the physical entity and on its
    /// entity-reference subject.
    fn collect_xrefs(&self, record: &SubjectRecord) -> Vec<Xref> {
        let mut xref_iris: Vec<&String> = record.xrefs.iter().collect();
        for reference_iri in &record.entity_references {
            if let Some(reference) = self.records.get(reference_iri) {
                xref_iris.extend(reference.xrefs.iter());
            }
        }

        let mut out = Vec::new();
        for xref_iri in xref_iris {
            let Some(xref) = self.records.get(xref_iri) else {
                continue;
            };
            if let (Some(db), Some(id)) = (&xref.db, &xref.id) {
                out.push(Xref::new(Namespace::from_db_label(db), id.clone()));
            }
        }
        out.sort();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reaction R1: input p1, output p2, catalyst c1. Expect one catalysis
    /// edge and one directional edge, both tagged with R1.
    const REACTION_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:bp="http://www.biopax.org/release/biopax-level3.owl#">
  <bp:Pathway rdf:about="http://example.org/bp#Pathway1">
    <bp:displayName>Acetaldehyde clearance</bp:displayName>
    <bp:pathwayComponent rdf:resource="http://example.org/bp#R1"/>
    <bp:organism rdf:resource="http://example.org/bp#BioSource1"/>
    <bp:xref rdf:resource="http://example.org/bp#PathwayXref1"/>
  </bp:Pathway>
  <bp:BioSource rdf:about="http://example.org/bp#BioSource1">
    <bp:name>Homo sapiens</bp:name>
  </bp:BioSource>
  <bp:UnificationXref rdf:about="http://example.org/bp#PathwayXref1">
    <bp:db>Reactome</bp:db>
    <bp:id>R-HSA-0001</bp:id>
  </bp:UnificationXref>
  <bp:BiochemicalReaction rdf:about="http://example.org/bp#R1">
    <bp:left rdf:resource="http://example.org/bp#p1"/>
    <bp:right rdf:resource="http://example.org/bp#p2"/>
  </bp:BiochemicalReaction>
  <bp:Catalysis rdf:about="http://example.org/bp#Cat1">
    <bp:controller rdf:resource="http://example.org/bp#c1"/>
    <bp:controlled rdf:resource="http://example.org/bp#R1"/>
    <bp:controlType>ACTIVATION</bp:controlType>
  </bp:Catalysis>
  <bp:SmallMolecule rdf:about="http://example.org/bp#p1">
    <bp:displayName>acetaldehyde</bp:displayName>
  </bp:SmallMolecule>
  <bp:SmallMolecule rdf:about="http://example.org/bp#p2">
    <bp:displayName>acetate</bp:displayName>
  </bp:SmallMolecule>
  <bp:Protein rdf:about="http://example.org/bp#c1">
    <bp:displayName>ALDH2</bp:displayName>
    <bp:entityReference rdf:resource="http://example.org/bp#c1ref"/>
  </bp:Protein>
  <bp:ProteinReference rdf:about="http://example.org/bp#c1ref">
    <bp:xref rdf:resource="http://example.org/bp#c1xref"/>
  </bp:ProteinReference>
  <bp:UnificationXref rdf:about="http://example.org/bp#c1xref">
    <bp:db>UniProt</bp:db>
    <bp:id>P05091</bp:id>
  </bp:UnificationXref>
</rdf:RDF>
"#;

    fn parse_one(text: &str) -> RawPathway {
        let mut pathways = BiopaxSource
            .parse(text, &ConvertOptions::default())
            .unwrap();
        assert_eq!(pathways.len(), 1);
        pathways.remove(0)
    }

    #[test]
    fn reaction_yields_directional_edge_and_catalysis_with_provenance() {
        let raw = parse_one(REACTION_DOC);

        let increases: Vec<_> = raw
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::Increases)
            .collect();
        assert_eq!(increases.len(), 1);
        assert_eq!(increases[0].source, EntityId::new("p1"));
        assert_eq!(increases[0].target, EntityId::new("p2"));
        assert_eq!(increases[0].provenance.origin.as_deref(), Some("R1"));

        let catalysis: Vec<_> = raw
            .relationships
            .iter()
            .filter(|r| r.kind == RelationKind::Catalysis)
            .collect();
        assert_eq!(catalysis.len(), 1);
        assert_eq!(catalysis[0].source, EntityId::new("c1"));
        assert_eq!(catalysis[0].provenance.origin.as_deref(), Some("R1"));
    }

    #[test]
    fn pathway_metadata_uses_reactome_accession_and_organism() {
        let raw = parse_one(REACTION_DOC);

        assert_eq!(raw.metadata.id, "R-HSA-0001");
        assert_eq!(raw.metadata.title, "Acetaldehyde clearance");
        assert_eq!(raw.metadata.organism.as_deref(), Some("Homo sapiens"));
    }

    #[test]
    fn entity_reference_xrefs_land_on_the_entity() {
        let raw = parse_one(REACTION_DOC);

        let protein = raw
            .entities
            .iter()
            .find(|e| e.id == EntityId::new("c1"))
            .unwrap();
        assert_eq!(protein.kind, EntityKind::Protein);
        assert!(protein
            .xrefs
            .contains(&Xref::new(Namespace::Uniprot, "P05091")));
    }

    #[test]
    fn reaction_missing_output_role_is_skipped_not_fatal() {
        let text = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:bp="http://www.biopax.org/release/biopax-level3.owl#">
  <bp:Pathway rdf:about="http://example.org/bp#Pathway1">
    <bp:displayName>Broken</bp:displayName>
    <bp:pathwayComponent rdf:resource="http://example.org/bp#R1"/>
  </bp:Pathway>
  <bp:BiochemicalReaction rdf:about="http://example.org/bp#R1">
    <bp:left rdf:resource="http://example.org/bp#p1"/>
  </bp:BiochemicalReaction>
  <bp:SmallMolecule rdf:about="http://example.org/bp#p1"/>
</rdf:RDF>
"#;
        let raw = parse_one(text);

        assert!(raw.relationships.is_empty());
        assert_eq!(raw.skipped, 1);
    }

    #[test]
    fn complex_components_become_members_and_component_edges() {
        let text = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:bp="http://www.biopax.org/release/biopax-level3.owl#">
  <bp:Pathway rdf:about="http://example.org/bp#Pathway1">
    <bp:pathwayComponent rdf:resource="http://example.org/bp#R1"/>
  </bp:Pathway>
  <bp:BiochemicalReaction rdf:about="http://example.org/bp#R1">
    <bp:left rdf:resource="http://example.org/bp#cx"/>
    <bp:right rdf:resource="http://example.org/bp#p2"/>
  </bp:BiochemicalReaction>
  <bp:Complex rdf:about="http://example.org/bp#cx">
    <bp:displayName>CDK4:CCND1</bp:displayName>
    <bp:component rdf:resource="http://example.org/bp#m1"/>
    <bp:component rdf:resource="http://example.org/bp#m2"/>
  </bp:Complex>
  <bp:Protein rdf:about="http://example.org/bp#m1"/>
  <bp:Protein rdf:about="http://example.org/bp#m2"/>
  <bp:SmallMolecule rdf:about="http://example.org/bp#p2"/>
</rdf:RDF>
"#;
        let raw = parse_one(text);

        let complex = raw
            .entities
            .iter()
            .find(|e| e.id == EntityId::new("cx"))
            .unwrap();
        assert_eq!(complex.kind, EntityKind::Complex);
        assert_eq!(complex.members, vec![EntityId::new("m1"), EntityId::new("m2")]);
        assert_eq!(
            raw.relationships
                .iter()
                .filter(|r| r.kind == RelationKind::HasComponent)
                .count(),
            2
        );
    }

    #[test]
    fn unrecognized_entity_class_defaults_to_other() {
        let text = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:bp="http://www.biopax.org/release/biopax-level3.owl#">
  <bp:Pathway rdf:about="http://example.org/bp#Pathway1">
    <bp:pathwayComponent rdf:resource="http://example.org/bp#R1"/>
  </bp:Pathway>
  <bp:BiochemicalReaction rdf:about="http://example.org/bp#R1">
    <bp:left rdf:resource="http://example.org/bp#weird"/>
    <bp:right rdf:resource="http://example.org/bp#p2"/>
  </bp:BiochemicalReaction>
  <bp:PhysicalEntity rdf:about="http://example.org/bp#weird"/>
  <bp:SmallMolecule rdf:about="http://example.org/bp#p2"/>
</rdf:RDF>
"#;
        let raw = parse_one(text);

        let entity = raw
            .entities
            .iter()
            .find(|e| e.id == EntityId::new("weird"))
            .unwrap();
        assert_eq!(entity.kind, EntityKind::Other);
    }

    #[test]
    fn every_pathway_subject_yields_its_own_raw_pathway() {
        let text = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:bp="http://www.biopax.org/release/biopax-level3.owl#">
  <bp:Pathway rdf:about="http://example.org/bp#Parent">
    <bp:pathwayComponent rdf:resource="http://example.org/bp#Child"/>
  </bp:Pathway>
  <bp:Pathway rdf:about="http://example.org/bp#Child">
    <bp:pathwayComponent rdf:resource="http://example.org/bp#R1"/>
  </bp:Pathway>
  <bp:BiochemicalReaction rdf:about="http://example.org/bp#R1">
    <bp:left rdf:resource="http://example.org/bp#p1"/>
    <bp:right rdf:resource="http://example.org/bp#p2"/>
  </bp:BiochemicalReaction>
  <bp:SmallMolecule rdf:about="http://example.org/bp#p1"/>
  <bp:SmallMolecule rdf:about="http://example.org/bp#p2"/>
</rdf:RDF>
"#;
        let pathways = BiopaxSource.parse(text, &ConvertOptions::default()).unwrap();

        assert_eq!(pathways.len(), 2);
        // The parent keeps the child as a single pathway-reference node.
        let parent = pathways
            .iter()
            .find(|p| p.metadata.id == "Parent")
            .unwrap();
        assert_eq!(parent.entities.len(), 1);
        assert_eq!(parent.entities[0].kind, EntityKind::Pathway);
        // The child converts its own reaction.
        let child = pathways.iter().find(|p| p.metadata.id == "Child").unwrap();
        assert_eq!(child.relationships.len(), 1);
    }

    #[test]
    fn garbage_document_is_pathway_fatal() {
        let err = BiopaxSource
            .parse("this is not rdf/xml", &ConvertOptions::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::Malformed { format: "biopax", .. }));
    }
}
