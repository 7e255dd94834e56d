//! Gene-to-term annotation records
//!
//! An [`Annotation`] is immutable once built. Propagation never edits one in
//! place; it derives a copy through [`Annotation::propagated`] and inserts the
//! copy on the ancestor. Equality and hashing cover every field, so a term's
//! annotation set collapses exact duplicates only.

use chrono::NaiveDate;
use serde::Serialize;

/// Association of a gene with an ontology term
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Annotation {
    xrdb: Option<String>,
    gene_id: String,
    reference: Option<String>,
    evidence: Option<String>,
    date: Option<NaiveDate>,
    direct: bool,
    cross_annotated: bool,
    origin: Option<String>,
    ortho_evidence: Option<String>,
    ready_regulates_cutoff: bool,
}

impl Annotation {
    /// Start building an annotation for `gene_id`
    pub fn builder(gene_id: impl Into<String>) -> AnnotationBuilder {
        AnnotationBuilder::new(gene_id)
    }

    pub fn xrdb(&self) -> Option<&str> {
        self.xrdb.as_deref()
    }

    pub fn gene_id(&self) -> &str {
        &self.gene_id
    }

    /// Publication identifier supporting the association
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Evidence code such as `EXP` or `IDA`
    pub fn evidence(&self) -> Option<&str> {
        self.evidence.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// True when the gene was annotated to this term itself rather than reaching it
    /// through propagation
    pub fn is_direct(&self) -> bool {
        self.direct
    }

    pub fn is_cross_annotated(&self) -> bool {
        self.cross_annotated
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn ortho_evidence(&self) -> Option<&str> {
        self.ortho_evidence.as_deref()
    }

    /// Set once the annotation has crossed a `regulates` or `part_of` edge
    pub fn is_ready_regulates_cutoff(&self) -> bool {
        self.ready_regulates_cutoff
    }

    /// Copy carried one step upward during propagation.
    ///
    /// The copy is indirect, not cross-annotated and has no origin. When
    /// `cutoff` is `None` the current cutoff flag is inherited.
    pub fn propagated(&self, cutoff: Option<bool>) -> Annotation {
        Annotation {
            direct: false,
            cross_annotated: false,
            origin: None,
            ready_regulates_cutoff: cutoff.unwrap_or(self.ready_regulates_cutoff),
            ..self.clone()
        }
    }

    /// Copy of this annotation pointing at a different gene identifier.
    ///
    /// Used when translating gene ids through an [`crate::IdMap`]. The
    /// database prefix no longer applies and propagation state starts over.
    pub fn remapped(&self, gene_id: impl Into<String>) -> Annotation {
        Annotation {
            xrdb: None,
            gene_id: gene_id.into(),
            reference: self.reference.clone(),
            evidence: self.evidence.clone(),
            date: self.date,
            direct: self.direct,
            cross_annotated: self.cross_annotated,
            origin: None,
            ortho_evidence: None,
            ready_regulates_cutoff: false,
        }
    }
}

/// Builder for [`Annotation`]
#[derive(Debug, Clone)]
pub struct AnnotationBuilder {
    inner: Annotation,
}

impl AnnotationBuilder {
    fn new(gene_id: impl Into<String>) -> Self {
        Self {
            inner: Annotation {
                xrdb: None,
                gene_id: gene_id.into(),
                reference: None,
                evidence: None,
                date: None,
                direct: false,
                cross_annotated: false,
                origin: None,
                ortho_evidence: None,
                ready_regulates_cutoff: false,
            },
        }
    }

    pub fn xrdb(mut self, xrdb: impl Into<String>) -> Self {
        self.inner.xrdb = Some(xrdb.into());
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.inner.reference = Some(reference.into());
        self
    }

    pub fn evidence(mut self, evidence: impl Into<String>) -> Self {
        self.inner.evidence = Some(evidence.into());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.inner.date = Some(date);
        self
    }

    pub fn direct(mut self, direct: bool) -> Self {
        self.inner.direct = direct;
        self
    }

    pub fn cross_annotated(mut self, cross_annotated: bool) -> Self {
        self.inner.cross_annotated = cross_annotated;
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.inner.origin = Some(origin.into());
        self
    }

    pub fn ortho_evidence(mut self, ortho_evidence: impl Into<String>) -> Self {
        self.inner.ortho_evidence = Some(ortho_evidence.into());
        self
    }

    pub fn ready_regulates_cutoff(mut self, ready: bool) -> Self {
        self.inner.ready_regulates_cutoff = ready;
        self
    }

    pub fn build(self) -> Annotation {
        self.inner
    }
}
