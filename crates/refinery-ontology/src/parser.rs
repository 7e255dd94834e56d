//! OBO stream parser
//!
//! Single forward pass over the lines of an OBO document. Terms are created
//! on first reference, so a child may name a parent whose `[Term]` block only
//! appears later in the file.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use refinery_common::text::token_name;
use tracing::{debug, info, warn};

use crate::error::{OntologyError, Result};
use crate::graph::Ontology;

// ============================================================================
// Relationship classification
// ============================================================================

/// Structural effect of a `relationship:` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationshipKind {
    Regulates,
    PartOf,
    Other,
}

impl RelationshipKind {
    fn classify(keyword: &str) -> Option<Self> {
        // has_part points at children, not parents
        if keyword.contains("has_part") {
            return None;
        }
        Some(match keyword {
            "regulates" | "positively_regulates" | "negatively_regulates" => Self::Regulates,
            "part_of" => Self::PartOf,
            _ => Self::Other,
        })
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Incremental OBO parser feeding an [`Ontology`]
#[derive(Debug, Default)]
pub struct OboParser {
    ontology: Ontology,
    inside_term: bool,
    current: Option<String>,
    lines_read: usize,
}

impl OboParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue parsing into an existing graph
    pub fn with_ontology(ontology: Ontology) -> Self {
        Self {
            ontology,
            ..Self::default()
        }
    }

    /// Parse a whole stream and return the finished graph
    pub fn parse<R: BufRead>(mut self, reader: R) -> Result<Ontology> {
        for line in reader.lines() {
            self.feed_line(&line?);
        }
        Ok(self.finish())
    }

    /// Process one line of OBO text
    pub fn feed_line(&mut self, line: &str) {
        self.lines_read += 1;
        let fields: Vec<&str> = line.split_whitespace().collect();

        let Some(&tag) = fields.first() else {
            self.close_block();
            self.inside_term = false;
            return;
        };

        match tag {
            "[Term]" => {
                self.close_block();
                self.inside_term = true;
            },
            _ if tag.starts_with('[') => {
                self.close_block();
                self.inside_term = false;
            },
            _ if !self.inside_term => {},
            "id:" => self.select_term(&fields),
            _ => self.apply_directive(tag, &fields),
        }
    }

    /// Close the last block and run the head reconciliation sweep
    pub fn finish(mut self) -> Ontology {
        self.close_block();

        let missing: Vec<String> = self
            .ontology
            .terms
            .values()
            .filter(|term| term.is_head && !self.ontology.heads.contains(&term.id))
            .map(|term| term.id.clone())
            .collect();
        for id in missing {
            debug!("Term {} not in heads, adding now", id);
            self.ontology.heads.push(id);
        }

        info!(
            "Parsed {} terms ({} heads) from {} lines",
            self.ontology.terms.len(),
            self.ontology.heads.len(),
            self.lines_read
        );
        self.ontology
    }

    fn close_block(&mut self) {
        let Some(id) = self.current.take() else {
            return;
        };
        let is_head = self
            .ontology
            .terms
            .get(&id)
            .is_some_and(|term| term.is_head);
        if is_head && !self.ontology.heads.contains(&id) {
            self.ontology.heads.push(id);
        }
    }

    fn select_term(&mut self, fields: &[&str]) {
        let Some(&id) = fields.get(1) else {
            warn!("id: line without a value at line {}", self.lines_read);
            self.current = None;
            return;
        };

        if self.ontology.obsolete.contains(id) {
            warn!("Ignoring block for obsolete term {}", id);
            self.current = None;
            return;
        }

        self.ontology.get_or_insert(id);
        self.current = Some(id.to_string());
    }

    fn apply_directive(&mut self, tag: &str, fields: &[&str]) {
        let Some(current) = self.current.clone() else {
            debug!("Directive {} outside of a term at line {}", tag, self.lines_read);
            return;
        };

        match tag {
            "name:" => {
                let full_name = fields[1..].join(" ");
                if let Some(term) = self.ontology.terms.get_mut(&current) {
                    term.name = Some(token_name(&full_name));
                    term.full_name = Some(full_name);
                }
            },
            "namespace:" => {
                if let (Some(namespace), Some(term)) =
                    (fields.get(1), self.ontology.terms.get_mut(&current))
                {
                    term.namespace = Some((*namespace).to_string());
                }
            },
            "def:" => {
                let remainder = fields[1..].join(" ");
                match quoted_text(&remainder) {
                    Some(description) => {
                        if let Some(term) = self.ontology.terms.get_mut(&current) {
                            term.description = Some(description.to_string());
                        }
                    },
                    None => warn!("Unquoted def: on term {}", current),
                }
            },
            "alt_id:" => {
                let Some(&alt_id) = fields.get(1) else {
                    return;
                };
                if let Some(term) = self.ontology.terms.get_mut(&current) {
                    if !term.alt_ids.iter().any(|a| a == alt_id) {
                        term.alt_ids.push(alt_id.to_string());
                    }
                }
                self.ontology.register_alt_id(alt_id, &current);
            },
            "xref:" => {
                let Some(&xref) = fields.get(1) else {
                    return;
                };
                if let Some(term) = self.ontology.terms.get_mut(&current) {
                    if !term.xrefs.iter().any(|x| x == xref) {
                        term.xrefs.push(xref.to_string());
                    }
                }
            },
            "is_a:" => {
                let Some(&parent_id) = fields.get(1) else {
                    warn!("is_a: without a parent on term {}", current);
                    return;
                };
                self.add_parent(&current, parent_id, RelationshipKind::Other);
            },
            "relationship:" => {
                let (Some(&keyword), Some(&parent_id)) = (fields.get(1), fields.get(2)) else {
                    warn!("Incomplete relationship on term {}", current);
                    return;
                };
                let Some(kind) = RelationshipKind::classify(keyword) else {
                    return;
                };
                if kind == RelationshipKind::Other {
                    info!("Unknown relationship {} on term {}", keyword, current);
                }
                self.add_parent(&current, parent_id, kind);
            },
            "is_obsolete:" => {
                if fields.get(1) == Some(&"false") {
                    return;
                }
                debug!("Removing obsolete term {}", current);
                self.ontology.detach(&current);
                self.ontology.obsolete.insert(current);
                self.current = None;
            },
            _ => {},
        }
    }

    fn add_parent(&mut self, child_id: &str, parent_id: &str, kind: RelationshipKind) {
        if self.ontology.obsolete.contains(parent_id) {
            warn!(
                "Term {} references obsolete term {}, edge ignored",
                child_id, parent_id
            );
            return;
        }

        self.ontology.get_or_insert(parent_id);
        self.ontology.link(child_id, parent_id);

        if let Some(child) = self.ontology.terms.get_mut(child_id) {
            match kind {
                RelationshipKind::Regulates => {
                    child.regulates.insert(parent_id.to_string());
                },
                RelationshipKind::PartOf => {
                    child.part_of.insert(parent_id.to_string());
                },
                RelationshipKind::Other => {},
            }
        }
    }
}

/// First double-quoted substring
fn quoted_text(text: &str) -> Option<&str> {
    let start = text.find('"')? + 1;
    let rest = text.get(start..)?;
    let end = rest.find('"').unwrap_or(rest.len());
    rest.get(..end)
}

// ============================================================================
// Loading
// ============================================================================

impl Ontology {
    /// Parse an OBO stream into a new graph
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        OboParser::new().parse(reader)
    }

    pub fn from_obo_str(content: &str) -> Result<Self> {
        Self::parse(content.as_bytes())
    }

    /// Load an OBO file from disk. Files ending in `.gz` are decompressed.
    pub fn load_obo_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            warn!("Could not open {} on the local filesystem", path.display());
            OntologyError::SourceUnavailable {
                location: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        info!("Loading ontology from {}", path.display());
        Self::parse(BufReader::new(reader))
    }
}
