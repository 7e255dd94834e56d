//! Ontology term node

use std::collections::BTreeSet;

use serde::Serialize;

use crate::annotation::Annotation;
use crate::summary::TermSummary;

/// One node of the ontology DAG.
///
/// Edges are stored as identifier sets resolved through the owning
/// [`crate::Ontology`]. `parent_of` and `child_of` are only ever changed in
/// pairs by the ontology, so the two directions always agree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Term {
    pub(crate) id: String,
    pub(crate) alt_ids: Vec<String>,
    pub(crate) name: Option<String>,
    pub(crate) full_name: Option<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) xrefs: Vec<String>,
    pub(crate) is_head: bool,
    pub(crate) valid: bool,
    pub(crate) parent_of: BTreeSet<String>,
    pub(crate) child_of: BTreeSet<String>,
    pub(crate) regulates: BTreeSet<String>,
    pub(crate) part_of: BTreeSet<String>,
    pub(crate) annotations: BTreeSet<Annotation>,
    pub(crate) votes: BTreeSet<String>,
    pub(crate) summary: Option<TermSummary>,
}

impl Term {
    /// New term placeholder: a head until a parent link says otherwise, valid
    /// until a taxon constraint rules it out
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_head: true,
            valid: true,
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alt_ids(&self) -> &[String] {
        &self.alt_ids
    }

    /// Normalized token name, e.g. `gpi_anchor_transamidase_complex`
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name exactly as it appeared in the source
    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn xrefs(&self) -> &[String] {
        &self.xrefs
    }

    pub fn is_head(&self) -> bool {
        self.is_head
    }

    /// False once a taxon constraint excludes the term for the current organism
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Ids of the children of this term
    pub fn parent_of(&self) -> &BTreeSet<String> {
        &self.parent_of
    }

    /// Ids of the parents of this term
    pub fn child_of(&self) -> &BTreeSet<String> {
        &self.child_of
    }

    /// Parent ids reached through `regulates`, `positively_regulates` or
    /// `negatively_regulates`
    pub fn regulates(&self) -> &BTreeSet<String> {
        &self.regulates
    }

    /// Parent ids reached through `part_of`
    pub fn part_of(&self) -> &BTreeSet<String> {
        &self.part_of
    }

    pub fn annotations(&self) -> &BTreeSet<Annotation> {
        &self.annotations
    }

    pub fn votes(&self) -> &BTreeSet<String> {
        &self.votes
    }

    pub fn summary(&self) -> Option<&TermSummary> {
        self.summary.as_ref()
    }

    /// Display name, falling back to the id for unnamed placeholder terms
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Distinct gene ids across all annotations
    pub fn gene_ids(&self) -> BTreeSet<&str> {
        self.annotations.iter().map(Annotation::gene_id).collect()
    }

    /// Distinct gene ids across direct annotations only
    pub fn direct_gene_ids(&self) -> BTreeSet<&str> {
        self.annotations
            .iter()
            .filter(|a| a.is_direct())
            .map(Annotation::gene_id)
            .collect()
    }

    /// Distinct gene ids, optionally including cross-annotations from other organisms
    pub fn annotated_genes(&self, include_cross: bool) -> BTreeSet<&str> {
        self.annotations
            .iter()
            .filter(|a| include_cross || !a.is_cross_annotated())
            .map(Annotation::gene_id)
            .collect()
    }

    /// Record an orthology-derived annotation for `gene_id`.
    ///
    /// Unless `allow_duplicate_gene` is set, a gene that is already annotated
    /// to this term is left alone. Returns whether an annotation was added.
    pub fn add_cross_annotation(
        &mut self,
        gene_id: &str,
        reference: Option<&str>,
        origin: &str,
        ortho_evidence: Option<&str>,
        allow_duplicate_gene: bool,
    ) -> bool {
        if !allow_duplicate_gene && self.annotations.iter().any(|a| a.gene_id() == gene_id) {
            return false;
        }

        let mut builder = Annotation::builder(gene_id)
            .cross_annotated(true)
            .origin(origin);
        if let Some(reference) = reference {
            builder = builder.reference(reference);
        }
        if let Some(evidence) = ortho_evidence {
            builder = builder.ortho_evidence(evidence);
        }
        self.annotations.insert(builder.build())
    }

    pub(crate) fn summary_mut(&mut self) -> &mut TermSummary {
        let id = self.id.clone();
        self.summary.get_or_insert_with(|| TermSummary::new(id))
    }

    pub(crate) fn forget_parent(&mut self, parent_id: &str) {
        self.child_of.remove(parent_id);
        self.regulates.remove(parent_id);
        self.part_of.remove(parent_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_term_defaults() {
        let term = Term::new("GO:0008150");

        assert_eq!(term.id(), "GO:0008150");
        assert!(term.is_head());
        assert!(term.is_valid());
        assert!(term.parent_of().is_empty());
        assert!(term.child_of().is_empty());
        assert!(term.annotations().is_empty());
        assert_eq!(term.display_name(), "GO:0008150");
    }

    #[test]
    fn test_gene_id_sets() {
        let mut term = Term::new("GO:1");
        term.annotations
            .insert(Annotation::builder("G1").direct(true).build());
        term.annotations
            .insert(Annotation::builder("G1").evidence("IDA").build());
        term.annotations.insert(Annotation::builder("G2").build());

        assert_eq!(term.gene_ids().len(), 2);
        assert_eq!(term.direct_gene_ids().into_iter().collect::<Vec<_>>(), vec!["G1"]);
    }

    #[test]
    fn test_cross_annotation_respects_duplicates() {
        let mut term = Term::new("GO:1");
        term.annotations
            .insert(Annotation::builder("G1").direct(true).build());

        assert!(!term.add_cross_annotation("G1", None, "HUMAN", Some("0.8"), false));
        assert!(term.add_cross_annotation("G2", Some("1234"), "HUMAN", Some("0.8"), false));
        assert!(term.add_cross_annotation("G1", None, "HUMAN", None, true));

        assert_eq!(term.annotated_genes(false).len(), 1);
        assert_eq!(term.annotated_genes(true).len(), 2);
    }
}
