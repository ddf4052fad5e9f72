//! The unified pathway graph model.
//!
//! Every source format is reduced to the same vocabulary: typed entities,
//! typed relationships and per-pathway metadata. The enums here are closed on
//! purpose — an unmapped source subtype has to go through an explicit
//! fallback (`EntityKind::Other`, or a recorded skip) instead of leaking a
//! stringly-typed tag into the graph.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Source databases
// ============================================================================

/// The database a pathway (or one of its elements) was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDb {
    Kegg,
    Reactome,
    WikiPathways,
}

impl fmt::Display for SourceDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDb::Kegg => write!(f, "kegg"),
            SourceDb::Reactome => write!(f, "reactome"),
            SourceDb::WikiPathways => write!(f, "wikipathways"),
        }
    }
}

/// PubMed id for the KEGG reference publication, carried on KEGG edges.
pub const KEGG_CITATION: &str = "10592173";
/// PubMed id for the Reactome reference publication, carried on Reactome edges.
pub const REACTOME_CITATION: &str = "29145629";

// ============================================================================
// Entity / relationship vocabularies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Gene,
    Protein,
    Rna,
    Chemical,
    /// A physical complex with listed members.
    Complex,
    /// A set of interchangeable gene products (e.g. a multi-gene diagram node).
    Family,
    BiologicalProcess,
    /// A reference to another pathway.
    Pathway,
    /// Source class had no mapping; retained rather than dropped.
    Other,
}

impl EntityKind {
    /// Kinds that carry a member list.
    pub fn is_composite(self) -> bool {
        matches!(self, EntityKind::Complex | EntityKind::Family)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Increases,
    Decreases,
    Association,
    PartOf,
    HasComponent,
    Catalysis,
    Inhibition,
    Translocation,
    Binding,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationKind::Increases => "increases",
            RelationKind::Decreases => "decreases",
            RelationKind::Association => "association",
            RelationKind::PartOf => "part_of",
            RelationKind::HasComponent => "has_component",
            RelationKind::Catalysis => "catalysis",
            RelationKind::Inhibition => "inhibition",
            RelationKind::Translocation => "translocation",
            RelationKind::Binding => "binding",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// External identifier namespaces
// ============================================================================

/// Namespaces an entity cross-reference can point into.
///
/// `Other` keeps unknown source vocabularies representable without widening
/// the resolver contract — the resolver treats them as unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Hgnc,
    Entrez,
    Uniprot,
    Ensembl,
    Chebi,
    Pubchem,
    Chemspider,
    Hmdb,
    Wikidata,
    Mirbase,
    Kegg,
    Reactome,
    Wikipathways,
    Other(String),
}

impl Namespace {
    /// Map a source database label (BioPAX `bp:db`, identifiers.org path
    /// segment, …) to a namespace. Unknown labels are preserved as `Other`.
    pub fn from_db_label(label: &str) -> Namespace {
        match label.trim().to_ascii_lowercase().as_str() {
            "hgnc" | "hgnc symbol" | "hgnc.symbol" => Namespace::Hgnc,
            "entrez" | "entrez gene" | "ncbigene" | "ncbi gene" => Namespace::Entrez,
            "uniprot" | "uniprotkb" | "uniprot knowledgebase" => Namespace::Uniprot,
            "ensembl" => Namespace::Ensembl,
            "chebi" => Namespace::Chebi,
            "pubchem" | "pubchem.compound" | "pubchem compound" => Namespace::Pubchem,
            "chemspider" => Namespace::Chemspider,
            "hmdb" => Namespace::Hmdb,
            "wikidata" => Namespace::Wikidata,
            "mirbase" | "mirbase.mature" => Namespace::Mirbase,
            "kegg" | "kegg compound" | "kegg.compound" => Namespace::Kegg,
            "reactome" | "reactome database id release" => Namespace::Reactome,
            "wikipathways" => Namespace::Wikipathways,
            other => Namespace::Other(other.to_string()),
        }
    }

    /// Resolution preference: gene-symbol namespaces first, then accession
    /// namespaces, then chemical namespaces. Lower sorts earlier.
    pub fn priority(&self) -> u8 {
        match self {
            Namespace::Hgnc => 0,
            Namespace::Entrez => 1,
            Namespace::Uniprot => 2,
            Namespace::Ensembl => 3,
            Namespace::Chebi => 4,
            Namespace::Pubchem => 5,
            Namespace::Chemspider => 6,
            Namespace::Hmdb => 7,
            Namespace::Wikidata => 8,
            Namespace::Mirbase => 9,
            Namespace::Kegg => 10,
            Namespace::Reactome => 11,
            Namespace::Wikipathways => 12,
            Namespace::Other(_) => 13,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Hgnc => write!(f, "hgnc"),
            Namespace::Entrez => write!(f, "ncbigene"),
            Namespace::Uniprot => write!(f, "uniprot"),
            Namespace::Ensembl => write!(f, "ensembl"),
            Namespace::Chebi => write!(f, "chebi"),
            Namespace::Pubchem => write!(f, "pubchem"),
            Namespace::Chemspider => write!(f, "chemspider"),
            Namespace::Hmdb => write!(f, "hmdb"),
            Namespace::Wikidata => write!(f, "wikidata"),
            Namespace::Mirbase => write!(f, "mirbase"),
            Namespace::Kegg => write!(f, "kegg"),
            Namespace::Reactome => write!(f, "reactome"),
            Namespace::Wikipathways => write!(f, "wikipathways"),
            Namespace::Other(label) => write!(f, "{label}"),
        }
    }
}

/// One external identifier attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Xref {
    pub namespace: Namespace,
    pub id: String,
}

impl Xref {
    pub fn new(namespace: Namespace, id: impl Into<String>) -> Xref {
        Xref {
            namespace,
            id: id.into(),
        }
    }
}

/// Outcome of identifier resolution for an entity. Parsers always emit
/// `Unresolved`; only the unifier upgrades it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Unresolved,
    Resolved {
        namespace: Namespace,
        id: String,
        name: String,
    },
}

// ============================================================================
// Entities and relationships
// ============================================================================

/// Stable local entity id, unique within one parsed pathway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> EntityId {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> EntityId {
        EntityId(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> EntityId {
        EntityId(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Human-readable display name; falls back to the raw identifier.
    pub label: String,
    /// Multi-namespace identifier set (an entity may carry e.g. both a gene
    /// symbol and a database accession).
    pub xrefs: Vec<Xref>,
    pub resolution: Resolution,
    /// Ordered member ids; only populated for composite kinds.
    pub members: Vec<EntityId>,
    pub source: SourceDb,
}

impl Entity {
    pub fn new(
        id: impl Into<EntityId>,
        kind: EntityKind,
        label: impl Into<String>,
        source: SourceDb,
    ) -> Entity {
        Entity {
            id: id.into(),
            kind,
            label: label.into(),
            xrefs: Vec::new(),
            resolution: Resolution::Unresolved,
            members: Vec::new(),
            source,
        }
    }

    pub fn with_xref(mut self, xref: Xref) -> Entity {
        self.xrefs.push(xref);
        self
    }

    pub fn with_members(mut self, members: Vec<EntityId>) -> Entity {
        self.members = members;
        self
    }

    /// Xrefs in resolution preference order (`Namespace::priority`, then id).
    pub fn xrefs_by_priority(&self) -> Vec<&Xref> {
        let mut refs: Vec<&Xref> = self.xrefs.iter().collect();
        refs.sort_by(|a, b| {
            a.namespace
                .priority()
                .cmp(&b.namespace.priority())
                .then_with(|| a.cmp(b))
        });
        refs
    }
}

/// Where a relationship came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Provenance {
    pub database: SourceDb,
    /// External id of the pathway the relationship was parsed from.
    pub pathway: String,
    /// Originating reaction/interaction id within the source document.
    pub origin: Option<String>,
    /// Literature citation (PubMed id or source URI).
    pub citation: Option<String>,
}

impl Provenance {
    pub fn new(database: SourceDb, pathway: impl Into<String>) -> Provenance {
        Provenance {
            database,
            pathway: pathway.into(),
            origin: None,
            citation: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Provenance {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_citation(mut self, citation: impl Into<String>) -> Provenance {
        self.citation = Some(citation.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relationship {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationKind,
    pub directed: bool,
    pub provenance: Provenance,
}

impl Relationship {
    pub fn directed(
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
        kind: RelationKind,
        provenance: Provenance,
    ) -> Relationship {
        Relationship {
            source: source.into(),
            target: target.into(),
            kind,
            directed: true,
            provenance,
        }
    }

    pub fn undirected(
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
        kind: RelationKind,
        provenance: Provenance,
    ) -> Relationship {
        Relationship {
            source: source.into(),
            target: target.into(),
            kind,
            directed: false,
            provenance,
        }
    }
}

// ============================================================================
// Pathways
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathwayMetadata {
    /// External pathway identifier (e.g. `path:hsa00010`, `R-HSA-1234`, `WP1`).
    pub id: String,
    pub source: SourceDb,
    pub title: String,
    pub organism: Option<String>,
    pub description: Option<String>,
}

impl PathwayMetadata {
    pub fn new(id: impl Into<String>, source: SourceDb, title: impl Into<String>) -> PathwayMetadata {
        PathwayMetadata {
            id: id.into(),
            source,
            title: title.into(),
            organism: None,
            description: None,
        }
    }
}

/// An assembled, validated pathway graph.
///
/// Only `assemble` constructs this; there are no public mutators, so a value
/// handed to an exporter can never be changed after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pathway {
    pub(crate) metadata: PathwayMetadata,
    pub(crate) entities: Vec<Entity>,
    pub(crate) relationships: Vec<Relationship>,
    pub(crate) flattened: bool,
}

impl Pathway {
    pub fn metadata(&self) -> &PathwayMetadata {
        &self.metadata
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Whether composite diagram nodes were expanded at parse time.
    pub fn flattened(&self) -> bool {
        self.flattened
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    /// Distinct entity kinds present, for quick summaries.
    pub fn entity_kinds(&self) -> BTreeSet<EntityKind> {
        self.entities.iter().map(|e| e.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_label_roundtrip_covers_biopax_spellings() {
        assert_eq!(Namespace::from_db_label("UniProt"), Namespace::Uniprot);
        assert_eq!(Namespace::from_db_label("ChEBI"), Namespace::Chebi);
        assert_eq!(Namespace::from_db_label("NCBI Gene"), Namespace::Entrez);
        assert_eq!(
            Namespace::from_db_label("Reactome Database ID Release"),
            Namespace::Reactome
        );
        assert_eq!(
            Namespace::from_db_label("mystery-db"),
            Namespace::Other("mystery-db".to_string())
        );
    }

    #[test]
    fn xref_priority_prefers_gene_symbol_namespaces() {
        let entity = Entity::new("n1", EntityKind::Gene, "ALDH2", SourceDb::Kegg)
            .with_xref(Xref::new(Namespace::Kegg, "hsa:217"))
            .with_xref(Xref::new(Namespace::Hgnc, "404"))
            .with_xref(Xref::new(Namespace::Uniprot, "P05091"));

        let ordered = entity.xrefs_by_priority();
        assert_eq!(ordered[0].namespace, Namespace::Hgnc);
        assert_eq!(ordered[1].namespace, Namespace::Uniprot);
        assert_eq!(ordered[2].namespace, Namespace::Kegg);
    }
}
