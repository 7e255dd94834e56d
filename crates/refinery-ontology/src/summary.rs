//! Per-term summaries and hierarchy export

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Write;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{OntologyError, Result};
use crate::graph::Ontology;
use crate::term::Term;

/// Distinct gene counts for one organism
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationCounts {
    #[serde(rename = "d")]
    pub direct: usize,
    #[serde(rename = "t")]
    pub total: usize,
}

/// Reporting data attached to a term once its annotations are summarized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermSummary {
    pub term_id: String,
    pub organisms: BTreeMap<String, AnnotationCounts>,
    #[serde(rename = "nparents")]
    pub parent_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<AnnotationCounts>,
    #[serde(rename = "desc", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<String>,
}

impl TermSummary {
    pub fn new(term_id: impl Into<String>) -> Self {
        Self {
            term_id: term_id.into(),
            ..Default::default()
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

impl Ontology {
    /// Record distinct direct and total gene counts for `organism` on every
    /// term, then clear the annotation sets.
    ///
    /// Called once per organism when several organisms share one hierarchy.
    pub fn summarize(&mut self, organism: &str) {
        self.summarized_organisms.push(organism.to_string());

        for term in self.terms.values_mut() {
            let counts = AnnotationCounts {
                direct: term.direct_gene_ids().len(),
                total: term.gene_ids().len(),
            };
            term.annotations.clear();

            let parent_count = term.child_of.len();
            let summary = term.summary_mut();
            summary.organisms.insert(organism.to_string(), counts);
            summary.parent_count = parent_count;
        }

        info!("Summarized {} terms for {}", self.terms.len(), organism);
    }

    /// Set `flag` on the summary of each listed term
    pub fn summarize_flag(&mut self, ids: &[String], flag: &str) {
        for id in ids {
            match self.get_term_mut(id) {
                Some(term) => {
                    term.summary_mut().flags.insert(flag.to_string());
                },
                None => warn!("Cannot flag unknown term {} as {}", id, flag),
            }
        }
    }

    /// Record each term's distinct vote count in its summary
    pub fn summarize_votes(&mut self) {
        for term in self.terms.values_mut() {
            let votes = term.votes.len();
            term.summary_mut().votes = Some(votes);
        }
    }

    /// Nested `{name, direct, total | summary, children}` hierarchy.
    ///
    /// With `head_id` the tree starts at that term; otherwise an array holds
    /// one tree per head.
    pub fn to_json_tree(&self, head_id: Option<&str>) -> Result<Value> {
        match head_id {
            Some(id) => {
                let head = self
                    .get_term(id)
                    .ok_or_else(|| OntologyError::UnknownTerm(id.to_string()))?;
                self.tree_node(head, &mut HashSet::new())
            },
            None => {
                let mut trees = Vec::with_capacity(self.heads.len());
                for head in self.heads() {
                    trees.push(self.tree_node(head, &mut HashSet::new())?);
                }
                Ok(Value::Array(trees))
            },
        }
    }

    fn tree_node<'a>(&'a self, term: &'a Term, path: &mut HashSet<&'a str>) -> Result<Value> {
        if !path.insert(term.id.as_str()) {
            return Err(OntologyError::cycle(term.id.as_str()));
        }

        let mut children = Vec::new();
        for child_id in &term.parent_of {
            if let Some(child) = self.terms.get(child_id) {
                children.push(self.tree_node(child, path)?);
            }
        }
        path.remove(term.id.as_str());

        let mut node = json!({ "name": term.display_name() });
        match &term.summary {
            Some(summary) => node["summary"] = serde_json::to_value(summary)?,
            None => {
                node["direct"] = json!(term.annotations.iter().filter(|a| a.is_direct()).count());
                node["total"] = json!(term.annotations.len());
            },
        }
        if !children.is_empty() {
            node["children"] = Value::Array(children);
        }
        Ok(node)
    }

    /// Write one line per annotation, in term id order.
    ///
    /// The short form is `term\tgene`. The association form writes
    /// GAF-like columns with the propagation and cross-annotation status.
    pub fn write_associations<W: Write>(
        &self,
        out: &mut W,
        namespace: Option<&str>,
        association_format: bool,
    ) -> Result<usize> {
        let mut written = 0;
        for term in self.get_terms(None, namespace) {
            for annotation in &term.annotations {
                if association_format {
                    let date = annotation
                        .date()
                        .map(|d| d.format("%Y%m%d").to_string())
                        .unwrap_or_default();
                    let origin = if annotation.is_cross_annotated() {
                        annotation.origin().unwrap_or_default()
                    } else {
                        ""
                    };
                    writeln!(
                        out,
                        "{}\t{}\t\t\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t\t",
                        annotation.xrdb().unwrap_or_default(),
                        annotation.gene_id(),
                        term.id,
                        annotation.reference().unwrap_or_default(),
                        annotation.evidence().unwrap_or_default(),
                        date,
                        if annotation.is_direct() { "True" } else { "False" },
                        if annotation.is_cross_annotated() { "True" } else { "False" },
                        origin,
                        annotation.ortho_evidence().unwrap_or_default(),
                    )?;
                } else {
                    writeln!(out, "{}\t{}", term.id, annotation.gene_id())?;
                }
                written += 1;
            }
        }
        Ok(written)
    }
}
