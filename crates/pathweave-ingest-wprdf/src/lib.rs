//! WikiPathways diagram-annotation RDF (Turtle) ingestion for pathweave.
//!
//! One Turtle document annotates one pathway diagram with the `wp:`
//! vocabulary: `DataNode` subjects (gene products, metabolites, proteins,
//! pathway references), `Complex` subjects with `wp:participants`, and typed
//! `Interaction` subjects carrying `wp:source`/`wp:target` (directed) or
//! only participants (undirected).
//!
//! Statements are folded into per-subject records keyed by the subject IRI,
//! so duplicate declarations of the same subject collapse to one record —
//! the same DataNode declared under several interactions yields exactly one
//! entity.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::Infallible;

use sophia::api::prelude::*;
use tracing::{debug, warn};

use pathweave_graph::{
    ConvertOptions, Entity, EntityId, EntityKind, Namespace, ParseError, PathwayMetadata,
    PathwaySource, Provenance, RawPathway, RelationKind, Relationship, SourceDb, Xref,
};

pub const WP_NS: &str = "http://vocabularies.wikipathways.org/wp#";
pub const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL_IRI: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const DC_TITLE_IRI: &str = "http://purl.org/dc/elements/1.1/title";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";

/// [`PathwaySource`] implementation for WikiPathways Turtle documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct WpRdfSource;

impl PathwaySource for WpRdfSource {
    fn database(&self) -> SourceDb {
        SourceDb::WikiPathways
    }

    fn parse(&self, text: &str, _options: &ConvertOptions) -> Result<Vec<RawPathway>, ParseError> {
        let records = fold_statements(text)?;
        Ok(vec![pathway_from_records(&records)?])
    }
}

// ============================================================================
// RDF term model (display-form parsing)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Iri(String),
    Blank(String),
    Literal(String),
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
        if let Some(end) = rest.rfind('"') {
            return Term::Literal(rest[..end].replace("\\\"", "\"").replace("\\\\", "\\"));
        }
    }
    Term::Literal(s.to_string())
}

fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

/// Extract `(namespace, id)` from an identifiers.org-style IRI.
fn identifiers_org_parts(iri: &str) -> Option<(Namespace, String)> {
    let rest = iri
        .strip_prefix("http://identifiers.org/")
        .or_else(|| iri.strip_prefix("https://identifiers.org/"))?;
    let (collection, id) = rest.split_once('/')?;
    if id.is_empty() {
        return None;
    }
    Some((Namespace::from_db_label(collection), id.to_string()))
}

// ============================================================================
// Statement folding
// ============================================================================

/// Per-subject record; sets make duplicate triple blocks idempotent.
#[derive(Debug, Default, Clone)]
struct SubjectRecord {
    /// `wp:` class local names from `rdf:type`.
    types: BTreeSet<String>,
    label: Option<String>,
    identifier: Option<String>,
    title: Option<String>,
    description: Option<String>,
    organism_name: Option<String>,
    is_part_of: BTreeSet<String>,
    sources: BTreeSet<String>,
    targets: BTreeSet<String>,
    participants: BTreeSet<String>,
    /// `(bdb predicate local name, raw value)` cross-reference pairs.
    bdb_xrefs: BTreeSet<(String, String)>,
}

fn fold_statements(text: &str) -> Result<BTreeMap<String, SubjectRecord>, ParseError> {
    let cursor = std::io::Cursor::new(text.as_bytes().to_vec());
    let reader = std::io::BufReader::new(cursor);
    let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);

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
        .map_err(|e| ParseError::malformed("wikipathways-rdf", e.to_string()))?;

    Ok(records)
}

fn fold_statement(
    records: &mut BTreeMap<String, SubjectRecord>,
    subject: String,
    predicate: &str,
    object: Term,
) {
    let record = records.entry(subject).or_default();

    match (predicate, object) {
        (RDF_TYPE_IRI, Term::Iri(class_iri)) => {
            if let Some(local) = class_iri.strip_prefix(WP_NS) {
                record.types.insert(local.to_string());
            }
        }
        (RDFS_LABEL_IRI, Term::Literal(v)) => {
            record.label.get_or_insert(v);
        }
        (DC_TITLE_IRI, Term::Literal(v)) => {
            record.title.get_or_insert(v);
        }
        (pred, object) if pred.starts_with(DCTERMS_NS) => match (local_name(pred), object) {
            ("identifier", Term::Literal(v)) => {
                record.identifier.get_or_insert(v);
            }
            ("description", Term::Literal(v)) => {
                record.description.get_or_insert(v);
            }
            ("isPartOf", Term::Iri(v)) => {
                record.is_part_of.insert(v);
            }
            _ => {}
        },
        (pred, object) if pred.starts_with(WP_NS) => {
            let local = local_name(pred).to_string();
            match (local.as_str(), object) {
                ("organismName", Term::Literal(v)) => {
                    record.organism_name.get_or_insert(v);
                }
                ("source", Term::Iri(v)) => {
                    record.sources.insert(v);
                }
                ("target", Term::Iri(v)) => {
                    record.targets.insert(v);
                }
                ("participants", Term::Iri(v)) => {
                    record.participants.insert(v);
                }
                (_, Term::Iri(v)) if local.starts_with("bdb") => {
                    record.bdb_xrefs.insert((local, v));
                }
                (_, Term::Literal(v)) if local.starts_with("bdb") => {
                    record.bdb_xrefs.insert((local, v));
                }
                _ => {}
            }
        }
        _ => {}
    }
}

// ============================================================================
// Vocabulary tables
// ============================================================================

/// DataNode sub-type → entity kind. A bare `DataNode` with no finer type is
/// retained as `Other`.
fn data_node_kind(types: &BTreeSet<String>) -> EntityKind {
    if types.contains("GeneProduct") {
        EntityKind::Gene
    } else if types.contains("Protein") {
        EntityKind::Protein
    } else if types.contains("Rna") {
        EntityKind::Rna
    } else if types.contains("Metabolite") {
        EntityKind::Chemical
    } else if types.contains("Pathway") {
        EntityKind::Pathway
    } else if types.contains("Complex") {
        EntityKind::Complex
    } else {
        EntityKind::Other
    }
}

fn bdb_namespace(predicate_local: &str) -> Option<Namespace> {
    match predicate_local {
        "bdbHgncSymbol" => Some(Namespace::Hgnc),
        "bdbEntrezGene" => Some(Namespace::Entrez),
        "bdbUniprot" => Some(Namespace::Uniprot),
        "bdbEnsembl" => Some(Namespace::Ensembl),
        "bdbChEBI" => Some(Namespace::Chebi),
        "bdbPubChem" => Some(Namespace::Pubchem),
        "bdbChemspider" => Some(Namespace::Chemspider),
        "bdbHmdb" => Some(Namespace::Hmdb),
        "bdbWikidata" => Some(Namespace::Wikidata),
        _ => None,
    }
}

/// Interaction sub-types the fixed table knows, in precedence order.
fn interaction_kind(subtypes: &BTreeSet<&str>) -> Option<RelationKind> {
    if subtypes.contains("Stimulation") {
        Some(RelationKind::Increases)
    } else if subtypes.contains("Inhibition") {
        Some(RelationKind::Inhibition)
    } else if subtypes.contains("Catalysis") {
        Some(RelationKind::Catalysis)
    } else if subtypes.contains("Binding") {
        Some(RelationKind::Binding)
    } else if subtypes.contains("Conversion") || subtypes.contains("TranscriptionTranslation") {
        Some(RelationKind::Increases)
    } else {
        None
    }
}

// ============================================================================
// Pathway construction
// ============================================================================

fn pathway_from_records(
    records: &BTreeMap<String, SubjectRecord>,
) -> Result<RawPathway, ParseError> {
    // The pathway root is typed wp:Pathway without being a DataNode;
    // pathway-reference DataNodes carry both types.
    let (pathway_iri, pathway_record) = records
        .iter()
        .find(|(_, r)| r.types.contains("Pathway") && !r.types.contains("DataNode"))
        .ok_or(ParseError::NoPathway)?;

    let pathway_id = pathway_record
        .identifier
        .clone()
        .unwrap_or_else(|| local_name(pathway_iri).to_string());

    let mut metadata = PathwayMetadata::new(
        pathway_id.clone(),
        SourceDb::WikiPathways,
        pathway_record
            .title
            .clone()
            .unwrap_or_else(|| pathway_id.clone()),
    );
    metadata.organism = pathway_record.organism_name.clone();
    metadata.description = pathway_record.description.clone();

    let mut skipped = 0u32;
    let mut entities: Vec<Entity> = Vec::new();
    let mut known: HashMap<&str, EntityKind> = HashMap::new();

    // DataNodes and complexes first; interactions reference them by IRI.
    for (iri, record) in records {
        if iri == pathway_iri {
            continue;
        }
        let is_data_node = record.types.contains("DataNode");
        let is_complex = record.types.contains("Complex");
        if !is_data_node && !is_complex {
            continue;
        }
        if !record.is_part_of.contains(pathway_iri) {
            debug!(pathway = %pathway_id, subject = %iri, "node not part of this pathway; ignored");
            continue;
        }

        let kind = data_node_kind(&record.types);
        let label = record
            .label
            .clone()
            .or_else(|| record.identifier.clone())
            .unwrap_or_else(|| local_name(iri).to_string());

        let mut entity = Entity::new(iri.as_str(), kind, label, SourceDb::WikiPathways);
        for xref in collect_xrefs(iri, record) {
            entity = entity.with_xref(xref);
        }

        known.insert(iri.as_str(), kind);
        entities.push(entity);
    }

    let mut relationships: Vec<Relationship> = Vec::new();

    // Complex membership: every known participant becomes a member. A
    // complex whose participants are all unknown carries no information and
    // is dropped, as a whole, like its membership edges.
    let mut complex_members: Vec<(EntityId, Vec<EntityId>)> = Vec::new();
    let mut empty_complexes: Vec<String> = Vec::new();
    for (iri, record) in records {
        if !record.types.contains("Complex") || !record.is_part_of.contains(pathway_iri) {
            continue;
        }
        let members: Vec<EntityId> = record
            .participants
            .iter()
            .filter(|p| known.contains_key(p.as_str()) && p.as_str() != iri.as_str())
            .map(|p| EntityId::new(p.as_str()))
            .collect();
        if members.is_empty() {
            debug!(pathway = %pathway_id, complex = %iri, "complex without known participants; dropped");
            empty_complexes.push(iri.clone());
            continue;
        }
        for member in &members {
            relationships.push(Relationship::directed(
                iri.as_str(),
                member.clone(),
                RelationKind::HasComponent,
                Provenance::new(SourceDb::WikiPathways, pathway_id.clone()),
            ));
        }
        complex_members.push((EntityId::new(iri.as_str()), members));
    }
    for iri in &empty_complexes {
        known.remove(iri.as_str());
        entities.retain(|e| e.id.as_str() != iri.as_str());
    }
    for (complex_id, members) in complex_members {
        if let Some(entity) = entities.iter_mut().find(|e| e.id == complex_id) {
            entity.members = members;
        }
    }

    // Interactions.
    for (iri, record) in records {
        if !record.types.contains("Interaction") {
            continue;
        }
        if !record.is_part_of.contains(pathway_iri) {
            continue;
        }

        add_interaction_edges(
            iri,
            record,
            &known,
            &pathway_id,
            &mut relationships,
            &mut skipped,
        );
    }

    Ok(RawPathway {
        metadata,
        entities,
        relationships,
        skipped,
    })
}

fn collect_xrefs(iri: &str, record: &SubjectRecord) -> Vec<Xref> {
    let mut out = Vec::new();

    for (predicate_local, value) in &record.bdb_xrefs {
        let Some(namespace) = bdb_namespace(predicate_local) else {
            continue;
        };
        // Values are identifiers.org IRIs in practice, raw ids otherwise.
        let id = if value.starts_with("http") {
            local_name(value).to_string()
        } else {
            value.clone()
        };
        out.push(Xref::new(namespace, id));
    }

    // A dcterms:identifier on an identifiers.org subject names its own
    // namespace.
    if let Some(identifier) = &record.identifier {
        if let Some((namespace, _)) = identifiers_org_parts(iri) {
            out.push(Xref::new(namespace, identifier.clone()));
        }
    }

    out.sort();
    out.dedup();
    out
}

fn add_interaction_edges(
    iri: &str,
    record: &SubjectRecord,
    known: &HashMap<&str, EntityKind>,
    pathway_id: &str,
    relationships: &mut Vec<Relationship>,
    skipped: &mut u32,
) {
    let provenance = Provenance::new(SourceDb::WikiPathways, pathway_id.to_string())
        .with_origin(local_name(iri).to_string())
        .with_citation(iri.to_string());

    let subtypes: BTreeSet<&str> = record
        .types
        .iter()
        .map(String::as_str)
        .filter(|t| *t != "Interaction" && *t != "DirectedInteraction")
        .collect();

    let directed_kind = match interaction_kind(&subtypes) {
        Some(kind) => Some(kind),
        None if subtypes.is_empty() && record.types.contains("DirectedInteraction") => {
            Some(RelationKind::Association)
        }
        None if subtypes.is_empty() => None,
        None => {
            warn!(pathway = %pathway_id, interaction = %iri, subtypes = ?subtypes, "unknown interaction kind; dropped");
            *skipped += 1;
            return;
        }
    };

    match directed_kind {
        Some(kind) => {
            if record.sources.is_empty() || record.targets.is_empty() {
                warn!(pathway = %pathway_id, interaction = %iri, "directed interaction missing source or target; dropped");
                *skipped += 1;
                return;
            }
            for source in &record.sources {
                for target in &record.targets {
                    if !known.contains_key(source.as_str()) || !known.contains_key(target.as_str())
                    {
                        warn!(pathway = %pathway_id, interaction = %iri, "interaction endpoint is not a known node; dropped");
                        *skipped += 1;
                        continue;
                    }
                    relationships.push(Relationship::directed(
                        source.as_str(),
                        target.as_str(),
                        kind,
                        provenance.clone(),
                    ));
                }
            }
        }
        None => {
            // Undirected interaction: one symmetric association per
            // unordered participant pair.
            let participants: Vec<&String> = record
                .participants
                .iter()
                .filter(|p| known.contains_key(p.as_str()))
                .collect();
            if participants.len() < 2 {
                warn!(pathway = %pathway_id, interaction = %iri, "undirected interaction with fewer than two known participants; dropped");
                *skipped += 1;
                return;
            }
            for (i, a) in participants.iter().enumerate() {
                for b in participants.iter().skip(i + 1) {
                    relationships.push(Relationship::undirected(
                        a.as_str(),
                        b.as_str(),
                        RelationKind::Association,
                        provenance.clone(),
                    ));
                }
            }
        }
    }
}
