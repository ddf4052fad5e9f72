//! Unified pathway graph model and conversion spine.
//!
//! Three source databases describe pathways in structurally incompatible
//! ways (diagram XML, ontology triples, RDF annotations). This crate defines
//! the one graph vocabulary they all reduce to, plus the stages every
//! conversion passes through:
//!
//! ```text
//! document text
//!   └─ PathwaySource::parse          (format crate)
//!        └─ unify::unify             (identifier resolution + merging)
//!             └─ assemble::assemble  (invariant validation, freeze)
//!                  └─ Pathway        (handed to the exporter collaborator)
//! ```
//!
//! Parsers are polymorphic over [`PathwaySource`]; nothing downstream knows
//! which format produced a pathway.

pub mod assemble;
pub mod model;
pub mod resolve;
pub mod unify;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use assemble::AssembleError;
pub use model::{
    Entity, EntityId, EntityKind, Namespace, Pathway, PathwayMetadata, Provenance, RelationKind,
    Relationship, Resolution, SourceDb, Xref, KEGG_CITATION, REACTOME_CITATION,
};
pub use resolve::{MapResolver, NullResolver, ResolveError, ResolvedId, Resolver};
pub use unify::UnifyStats;

// ============================================================================
// Parser boundary
// ============================================================================

/// Conversion configuration. Constructed via `Default` or a struct literal,
/// so an invalid flatten value is unrepresentable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Expand composite diagram nodes into their members at relationship
    /// construction time. Only the diagram-XML format honors this.
    pub flatten: bool,
}

/// One pathway as recovered by a format parser, before unification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPathway {
    pub metadata: model::PathwayMetadata,
    pub entities: Vec<model::Entity>,
    pub relationships: Vec<model::Relationship>,
    /// Count of local-skip events (unknown relation kinds, malformed
    /// elements) recorded while parsing this pathway. Each one was logged
    /// with the pathway id and cause.
    pub skipped: u32,
}

/// A document could not be parsed at all (pathway-fatal).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed {format} document: {detail}")]
    Malformed { format: &'static str, detail: String },

    #[error("document contains no pathway")]
    NoPathway,
}

impl ParseError {
    pub fn malformed(format: &'static str, detail: impl Into<String>) -> ParseError {
        ParseError::Malformed {
            format,
            detail: detail.into(),
        }
    }
}

/// A format-specific parser: raw document → per-pathway entity/edge lists.
///
/// Diagram formats yield exactly one pathway per document; the
/// reaction-network format describes many pathways in one document and
/// yields one `RawPathway` per pathway subject it finds.
pub trait PathwaySource {
    fn database(&self) -> SourceDb;

    fn parse(&self, text: &str, options: &ConvertOptions) -> Result<Vec<RawPathway>, ParseError>;
}

// ============================================================================
// Conversion pipeline
// ============================================================================

/// Why one pathway's conversion was abandoned.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Per-pathway observability counters for one conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub skipped_elements: u32,
    pub resolved_entities: u32,
    pub unresolved_entities: u32,
    pub merged_entities: u32,
}

/// A successfully converted pathway plus its conversion counters.
#[derive(Debug, Clone)]
pub struct Converted {
    pub pathway: Pathway,
    pub report: ConversionReport,
}

/// Run the full pipeline over one document.
///
/// An unreadable document fails the whole call; a per-pathway assembly
/// rejection fails only that pathway's slot so sibling pathways in the same
/// document (reaction-network format) survive.
pub fn convert_document(
    source: &dyn PathwaySource,
    text: &str,
    resolver: &dyn Resolver,
    options: &ConvertOptions,
) -> Result<Vec<Result<Converted, ConvertError>>, ParseError> {
    let parsed = source.parse(text, options)?;

    Ok(parsed
        .into_iter()
        .map(|raw| convert_pathway(raw, resolver, options))
        .collect())
}

fn convert_pathway(
    raw: RawPathway,
    resolver: &dyn Resolver,
    options: &ConvertOptions,
) -> Result<Converted, ConvertError> {
    let skipped = raw.skipped;
    let (unified, stats) = unify::unify(raw, resolver);
    let pathway = assemble::assemble(unified, options.flatten)?;

    Ok(Converted {
        pathway,
        report: ConversionReport {
            skipped_elements: skipped,
            resolved_entities: stats.resolved,
            unresolved_entities: stats.unresolved,
            merged_entities: stats.merged,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, EntityKind, PathwayMetadata, Provenance, RelationKind, Relationship};

    struct FixtureSource;

    impl PathwaySource for FixtureSource {
        fn database(&self) -> SourceDb {
            SourceDb::Kegg
        }

        fn parse(&self, text: &str, _options: &ConvertOptions) -> Result<Vec<RawPathway>, ParseError> {
            if text.is_empty() {
                return Err(ParseError::NoPathway);
            }
            let good = RawPathway {
                metadata: PathwayMetadata::new("ok", SourceDb::Kegg, "ok"),
                entities: vec![Entity::new("a", EntityKind::Gene, "a", SourceDb::Kegg)],
                relationships: vec![],
                skipped: 1,
            };
            let bad = RawPathway {
                metadata: PathwayMetadata::new("bad", SourceDb::Kegg, "bad"),
                entities: vec![],
                relationships: vec![Relationship::directed(
                    "x",
                    "y",
                    RelationKind::Increases,
                    Provenance::new(SourceDb::Kegg, "bad"),
                )],
                skipped: 0,
            };
            Ok(vec![good, bad])
        }
    }

    #[test]
    fn per_pathway_failures_do_not_poison_siblings() {
        let outcomes = convert_document(
            &FixtureSource,
            "doc",
            &NullResolver,
            &ConvertOptions::default(),
        )
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        let ok = outcomes[0].as_ref().unwrap();
        assert_eq!(ok.pathway.metadata().id, "ok");
        assert_eq!(ok.report.skipped_elements, 1);
        assert!(matches!(
            outcomes[1],
            Err(ConvertError::Assemble(AssembleError::DanglingEdge { .. }))
        ));
    }

    #[test]
    fn unreadable_document_is_pathway_fatal() {
        let err = convert_document(
            &FixtureSource,
            "",
            &NullResolver,
            &ConvertOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::NoPathway));
    }
}
