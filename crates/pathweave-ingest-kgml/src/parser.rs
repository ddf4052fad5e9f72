//! Low-level KGML event parser.
//!
//! KGML keeps everything in attributes, so the state machine only tracks
//! which container element (`entry`, `relation`, `reaction`) is open and
//! folds child elements (`graphics`, `component`, `subtype`, `substrate`,
//! `product`) into it. Text content and the 2-D layout attributes are
//! ignored beyond the graphics display name.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use pathweave_graph::ParseError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KgmlEntry {
    pub id: String,
    /// Space-separated KEGG ids from the `name` attribute, split.
    pub names: Vec<String>,
    pub entry_type: String,
    pub graphics_name: Option<String>,
    /// Component entry ids, only present on `group` entries.
    pub components: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KgmlRelation {
    pub entry1: String,
    pub entry2: String,
    pub relation_type: String,
    /// `(name, value)` pairs from the `subtype` children.
    pub subtypes: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KgmlReaction {
    /// Entry id of the catalyzing gene product.
    pub id: String,
    pub name: String,
    pub reaction_type: String,
    pub substrates: Vec<String>,
    pub products: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KgmlDocument {
    pub name: String,
    pub org: String,
    pub title: String,
    pub link: String,
    pub entries: Vec<KgmlEntry>,
    pub relations: Vec<KgmlRelation>,
    pub reactions: Vec<KgmlReaction>,
    /// Malformed elements dropped during parsing (already logged).
    pub skipped: u32,
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    for a in e.attributes().flatten() {
        if a.key.as_ref() == name {
            return a.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}

#[derive(Default)]
struct ParserState {
    doc: KgmlDocument,
    saw_pathway: bool,
    entry: Option<KgmlEntry>,
    relation: Option<KgmlRelation>,
    reaction: Option<KgmlReaction>,
}

impl ParserState {
    fn open(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"pathway" => {
                self.saw_pathway = true;
                self.doc.name = attr(e, b"name").unwrap_or_default();
                self.doc.org = attr(e, b"org").unwrap_or_default();
                self.doc.title = attr(e, b"title").unwrap_or_default();
                self.doc.link = attr(e, b"link").unwrap_or_default();
            }
            b"entry" => match (attr(e, b"id"), attr(e, b"name"), attr(e, b"type")) {
                (Some(id), Some(name), Some(entry_type)) => {
                    self.entry = Some(KgmlEntry {
                        id,
                        names: name.split_whitespace().map(str::to_string).collect(),
                        entry_type,
                        graphics_name: None,
                        components: Vec::new(),
                    });
                }
                _ => {
                    warn!(pathway = %self.doc.name, "entry missing id/name/type attribute; dropped");
                    self.doc.skipped += 1;
                }
            },
            b"graphics" => {
                if let Some(entry) = self.entry.as_mut() {
                    if entry.graphics_name.is_none() {
                        entry.graphics_name = attr(e, b"name");
                    }
                }
            }
            b"component" => {
                if let Some(entry) = self.entry.as_mut() {
                    if let Some(id) = attr(e, b"id") {
                        entry.components.push(id);
                    }
                }
            }
            b"relation" => match (attr(e, b"entry1"), attr(e, b"entry2"), attr(e, b"type")) {
                (Some(entry1), Some(entry2), Some(relation_type)) => {
                    self.relation = Some(KgmlRelation {
                        entry1,
                        entry2,
                        relation_type,
                        subtypes: Vec::new(),
                    });
                }
                _ => {
                    warn!(pathway = %self.doc.name, "relation missing entry1/entry2/type attribute; dropped");
                    self.doc.skipped += 1;
                }
            },
            b"subtype" => {
                if let Some(relation) = self.relation.as_mut() {
                    if let Some(name) = attr(e, b"name") {
                        relation
                            .subtypes
                            .push((name, attr(e, b"value").unwrap_or_default()));
                    }
                }
            }
            b"reaction" => match (attr(e, b"id"), attr(e, b"name"), attr(e, b"type")) {
                (Some(id), Some(name), Some(reaction_type)) => {
                    self.reaction = Some(KgmlReaction {
                        id,
                        name,
                        reaction_type,
                        substrates: Vec::new(),
                        products: Vec::new(),
                    });
                }
                _ => {
                    warn!(pathway = %self.doc.name, "reaction missing id/name/type attribute; dropped");
                    self.doc.skipped += 1;
                }
            },
            b"substrate" => {
                if let Some(reaction) = self.reaction.as_mut() {
                    if let Some(id) = attr(e, b"id") {
                        reaction.substrates.push(id);
                    }
                }
            }
            b"product" => {
                if let Some(reaction) = self.reaction.as_mut() {
                    if let Some(id) = attr(e, b"id") {
                        reaction.products.push(id);
                    }
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"entry" => {
                if let Some(entry) = self.entry.take() {
                    self.doc.entries.push(entry);
                }
            }
            b"relation" => {
                if let Some(relation) = self.relation.take() {
                    self.doc.relations.push(relation);
                }
            }
            b"reaction" => {
                if let Some(reaction) = self.reaction.take() {
                    self.doc.reactions.push(reaction);
                }
            }
            _ => {}
        }
    }
}

/// Parse one KGML document. A document the XML reader cannot get through, or
/// one without a `<pathway>` root, is pathway-fatal.
pub fn parse_kgml(text: &str) -> Result<KgmlDocument, ParseError> {
    let mut reader = Reader::from_str(text);
    let mut state = ParserState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => state.open(&e),
            Ok(Event::Empty(e)) => {
                state.open(&e);
                state.close(e.name().as_ref());
            }
            Ok(Event::End(e)) => state.close(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(ParseError::malformed("kgml", err.to_string())),
        }
    }

    if !state.saw_pathway {
        return Err(ParseError::NoPathway);
    }

    Ok(state.doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0"?>
<pathway name="path:hsa00010" org="hsa" number="00010" title="Glycolysis" link="https://www.kegg.jp/pathway/hsa00010">
  <entry id="10" name="hsa:217" type="gene">
    <graphics name="ALDH2" type="rectangle" x="146" y="958"/>
  </entry>
  <entry id="11" name="cpd:C00084" type="compound">
    <graphics name="C00084" type="circle"/>
  </entry>
  <entry id="12" name="undefined" type="group">
    <graphics type="rectangle"/>
    <component id="10"/>
    <component id="11"/>
  </entry>
  <relation entry1="10" entry2="11" type="PPrel">
    <subtype name="activation" value="--&gt;"/>
  </relation>
  <reaction id="10" name="rn:R00710" type="reversible">
    <substrate id="11" name="cpd:C00084"/>
    <product id="11" name="cpd:C00084"/>
  </reaction>
</pathway>
"#;

    #[test]
    fn parses_entries_relations_and_reactions() {
        let doc = parse_kgml(MINIMAL).unwrap();

        assert_eq!(doc.name, "path:hsa00010");
        assert_eq!(doc.title, "Glycolysis");
        assert_eq!(doc.entries.len(), 3);
        assert_eq!(doc.entries[0].graphics_name.as_deref(), Some("ALDH2"));
        assert_eq!(doc.entries[2].components, vec!["10", "11"]);
        assert_eq!(doc.relations.len(), 1);
        assert_eq!(doc.relations[0].subtypes, vec![("activation".to_string(), "-->".to_string())]);
        assert_eq!(doc.reactions.len(), 1);
        assert_eq!(doc.reactions[0].reaction_type, "reversible");
        assert_eq!(doc.skipped, 0);
    }

    #[test]
    fn missing_pathway_root_is_fatal() {
        let err = parse_kgml("<notkgml/>").unwrap_err();
        assert!(matches!(err, ParseError::NoPathway));
    }

    #[test]
    fn entry_without_type_is_dropped_not_fatal() {
        let text = r#"<pathway name="path:hsa1" org="hsa" title="t" link="l">
            <entry id="1" name="hsa:1"/>
            <entry id="2" name="hsa:2" type="gene"/>
        </pathway>"#;
        let doc = parse_kgml(text).unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.skipped, 1);
    }

    #[test]
    fn mismatched_tags_are_fatal() {
        let text = r#"<pathway name="p" org="hsa" title="t" link="l"><entry id="1" name="hsa:1" type="gene"></pathway>"#;
        assert!(matches!(
            parse_kgml(text),
            Err(ParseError::Malformed { format: "kgml", .. })
        ));
    }
}
