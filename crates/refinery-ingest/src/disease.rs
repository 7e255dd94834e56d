//! Disease Ontology gene sets
//!
//! DO terms carry `xref: OMIM:<id>` lines; the genes behind each OMIM
//! disease come from a [`DiseaseGeneSource`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use refinery_ontology::{Annotation, Ontology, Term};
use tracing::{debug, info, warn};

use crate::config::RefineryConfig;
use crate::error::Result;
use crate::geneset::{annotations_by_gene, do_abstract, do_title, gene_set_slug, GeneSet};
use crate::tags::TagMap;

/// Genes known to be associated with an OMIM disease
pub trait DiseaseGeneSource {
    /// Gene ids for `omim_id` (digits only, no prefix)
    fn genes_for(&self, omim_id: &str) -> Vec<String>;

    /// Confidence labels the source admitted, quoted in abstracts
    fn confidence_labels(&self) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory OMIM disease to gene table
#[derive(Debug, Clone, Default)]
pub struct DiseaseGeneTable {
    genes: BTreeMap<String, BTreeSet<String>>,
    confidence: Vec<String>,
}

impl DiseaseGeneTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, omim_id: impl Into<String>, gene_id: impl Into<String>) {
        self.genes.entry(omim_id.into()).or_default().insert(gene_id.into());
    }

    pub fn with_confidence<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.confidence = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Read `omim_id\tgene_id` lines; `#` lines are comments
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t').map(str::trim);
            match (fields.next(), fields.next()) {
                (Some(omim), Some(gene)) if !omim.is_empty() && !gene.is_empty() => {
                    table.insert(omim.trim_start_matches("OMIM:"), gene);
                },
                _ => warn!("Skipping disease gene line {}: {}", index + 1, line),
            }
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl DiseaseGeneSource for DiseaseGeneTable {
    fn genes_for(&self, omim_id: &str) -> Vec<String> {
        self.genes
            .get(omim_id)
            .map(|genes| genes.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn confidence_labels(&self) -> Vec<String> {
        self.confidence.clone()
    }
}

/// OMIM ids cross-referenced by a term, without the prefix
pub fn omim_xrefs(term: &Term) -> Vec<String> {
    term.xrefs()
        .iter()
        .filter_map(|xref| xref.strip_prefix("OMIM:"))
        .map(str::to_string)
        .collect()
}

/// Attach direct annotations for every OMIM cross-reference. Returns the
/// number of annotations added.
pub fn annotate_from_omim(ontology: &mut Ontology, source: &dyn DiseaseGeneSource, xrdb: &str) -> usize {
    let xrefs: Vec<(String, Vec<String>)> = ontology
        .terms()
        .map(|(id, term)| (id.to_string(), omim_xrefs(term)))
        .filter(|(_, omim)| !omim.is_empty())
        .collect();

    let mut added = 0;
    for (term_id, omim_ids) in xrefs {
        for omim_id in omim_ids {
            let genes = source.genes_for(&omim_id);
            if genes.is_empty() {
                debug!("No genes for OMIM:{} on {}", omim_id, term_id);
            }
            for gene in genes {
                let annotation = Annotation::builder(gene).xrdb(xrdb).direct(true).build();
                if ontology.add_annotation(&term_id, annotation) {
                    added += 1;
                }
            }
        }
    }

    info!("Added {} OMIM-derived annotations", added);
    added
}

/// Annotate, propagate and format Disease Ontology gene sets
pub fn disease_gene_sets(
    mut ontology: Ontology,
    source: &dyn DiseaseGeneSource,
    config: &RefineryConfig,
    tags: Option<&TagMap>,
) -> Result<Vec<GeneSet>> {
    annotate_from_omim(&mut ontology, source, &config.xrdb);
    ontology.propagate()?;

    let confidence = source.confidence_labels();
    let mut gene_sets = Vec::new();
    for (term_id, term) in ontology.terms() {
        if term.annotations().is_empty() {
            continue;
        }

        gene_sets.push(GeneSet {
            title: do_title(term),
            abstract_text: Some(do_abstract(term, &omim_xrefs(term), &confidence)),
            organism: config.organism.clone(),
            xrdb: config.xrdb.clone(),
            slug: gene_set_slug(term_id, &config.organism),
            annotations: annotations_by_gene(term),
            tags: tags.map(|t| t.get(term_id).to_vec()).unwrap_or_default(),
        });
    }

    info!("Built {} disease gene sets", gene_sets.len());
    Ok(gene_sets)
}
