//! Taxon restriction
//!
//! Terms declared `only_in_taxon` or `never_in_taxon` are invalidated, along
//! with everything below them, when the organism being processed falls
//! outside (or inside) the declared lineage. Invalidation only clears the
//! `valid` flag; no term is removed.
//!
//! Lineage questions go to a [`TaxonLineage`] oracle. [`TaxonomyTree`] is an
//! in-memory oracle loaded from NCBI taxonomy dumps (`nodes.dmp`,
//! `names.dmp`), whose fields are separated by `\t|\t`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::BufRead;
use std::str::FromStr;

use tracing::{debug, error, info, warn};

use crate::error::{OntologyError, Result};
use crate::graph::Ontology;

const NCBI_TAXON: &str = "NCBITaxon";
const NCBI_TAXON_UNION: &str = "NCBITaxon_Union";

/// Taxonomy oracle used by taxon restriction
pub trait TaxonLineage {
    /// True when the taxonomy knows `taxon_id`
    fn contains(&self, taxon_id: &str) -> bool;

    /// True when `candidate` is an ancestor of `target` or `target` itself
    fn check_lineage(&self, candidate: &str, target: &str) -> bool;

    /// Taxon ids a name stands for. Empty when the name is unknown.
    fn resolve_name(&self, _name: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Taxon constraint keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonRelationship {
    OnlyIn,
    NeverIn,
}

impl FromStr for TaxonRelationship {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "only_in_taxon" => Ok(TaxonRelationship::OnlyIn),
            "never_in_taxon" => Ok(TaxonRelationship::NeverIn),
            other => Err(format!("Invalid taxon relationship: {}", other)),
        }
    }
}

// ============================================================================
// In-memory NCBI taxonomy
// ============================================================================

/// Parent table plus name lookup built from NCBI taxonomy dumps
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTree {
    parents: HashMap<String, String>,
    scientific_names: HashMap<String, String>,
    in_part: HashMap<String, Vec<String>>,
}

impl TaxonomyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `child -> parent`. The root points at itself.
    pub fn insert(&mut self, taxon_id: impl Into<String>, parent_id: impl Into<String>) {
        self.parents.insert(taxon_id.into(), parent_id.into());
    }

    pub fn insert_name(&mut self, name: impl Into<String>, taxon_id: impl Into<String>) {
        self.scientific_names.insert(name.into(), taxon_id.into());
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Load `tax_id\t|\tparent_tax_id\t|\t...` lines from `nodes.dmp`
    pub fn from_nodes_dmp<R: BufRead>(reader: R) -> Result<Self> {
        let mut tree = Self::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = dmp_fields(&line);
            match (fields.first(), fields.get(1)) {
                (Some(id), Some(parent)) if !id.is_empty() && !parent.is_empty() => {
                    tree.insert(*id, *parent);
                },
                _ => warn!("Skipping nodes.dmp line {}: expected tax id and parent", index + 1),
            }
        }

        info!("Loaded {} taxonomy nodes", tree.len());
        Ok(tree)
    }

    /// Add names from `names.dmp`. Scientific names map to one id; `in-part`
    /// names collect every id they cover.
    pub fn load_names_dmp<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut loaded = 0usize;
        for line in reader.lines() {
            let line = line?;
            let fields = dmp_fields(&line);
            let (Some(id), Some(name), Some(class)) = (fields.first(), fields.get(1), fields.get(3))
            else {
                continue;
            };

            match *class {
                "scientific name" => {
                    self.insert_name(*name, *id);
                    loaded += 1;
                },
                "in-part" => {
                    self.in_part
                        .entry((*name).to_string())
                        .or_default()
                        .push((*id).to_string());
                    loaded += 1;
                },
                _ => {},
            }
        }

        info!("Loaded {} taxonomy names", loaded);
        Ok(())
    }
}

fn dmp_fields(line: &str) -> Vec<&str> {
    line.split("\t|").map(str::trim).collect()
}

impl TaxonLineage for TaxonomyTree {
    fn contains(&self, taxon_id: &str) -> bool {
        self.parents.contains_key(taxon_id)
    }

    fn check_lineage(&self, candidate: &str, target: &str) -> bool {
        let mut current = target;
        let mut seen = HashSet::new();
        loop {
            if current == candidate {
                return true;
            }
            if !seen.insert(current) {
                return false;
            }
            match self.parents.get(current) {
                Some(parent) if parent != current => current = parent.as_str(),
                _ => return false,
            }
        }
    }

    fn resolve_name(&self, name: &str) -> Vec<String> {
        if let Some(id) = self.scientific_names.get(name) {
            return vec![id.clone()];
        }
        self.in_part.get(name).cloned().unwrap_or_default()
    }
}

// ============================================================================
// Restriction engine
// ============================================================================

/// Outcome of a taxon constraint pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxonReport {
    pub constraints: usize,
    pub invalidated_terms: usize,
}

impl Ontology {
    /// Set the organism the taxon constraints are evaluated for
    pub fn set_organism_taxon(&mut self, taxon_id: &str, oracle: &dyn TaxonLineage) -> Result<()> {
        if !oracle.contains(taxon_id) {
            return Err(OntologyError::UnknownTaxon(taxon_id.to_string()));
        }
        self.organism_taxon = Some(taxon_id.to_string());
        Ok(())
    }

    /// Apply one constraint to `term_id`. Returns the number of terms newly
    /// invalidated; an unknown term is skipped.
    pub fn restrict_taxon(
        &mut self,
        taxon_ids: &[String],
        term_id: &str,
        relationship: TaxonRelationship,
        oracle: &dyn TaxonLineage,
    ) -> Result<usize> {
        let organism = self
            .organism_taxon
            .clone()
            .ok_or(OntologyError::OrganismTaxonNotSet)?;

        let Some(canonical) = self.resolve_id(term_id).map(str::to_string) else {
            debug!("Taxon constraint on unknown term {}", term_id);
            return Ok(0);
        };

        let in_lineage = taxon_ids
            .iter()
            .any(|taxon| oracle.check_lineage(taxon, &organism));
        let invalidate = match relationship {
            TaxonRelationship::OnlyIn => !in_lineage,
            TaxonRelationship::NeverIn => in_lineage,
        };

        if !invalidate {
            return Ok(0);
        }
        Ok(self.invalidate_subtree(&canonical))
    }

    fn invalidate_subtree(&mut self, id: &str) -> usize {
        let mut ids: BTreeSet<String> = self.subtree_ids(id);
        ids.insert(id.to_string());

        let mut changed = 0;
        for id in &ids {
            if let Some(term) = self.terms.get_mut(id) {
                if term.valid {
                    term.valid = false;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Apply constraints from a taxon-constraint OBO stream.
    ///
    /// `relationship: only_in_taxon NCBITaxon:2759` lines name one taxon;
    /// `NCBITaxon_Union` lines list taxon names after the `!` comment marker,
    /// joined with `or`, resolved through the oracle. A keyword other than
    /// `only_in_taxon` / `never_in_taxon` aborts the pass.
    pub fn apply_taxon_constraints<R: BufRead>(
        &mut self,
        reader: R,
        oracle: &dyn TaxonLineage,
    ) -> Result<TaxonReport> {
        let mut report = TaxonReport::default();
        let mut inside = false;
        let mut term_id: Option<String> = None;

        for line in reader.lines() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let Some(&tag) = fields.first() else {
                continue;
            };

            match tag {
                "[Term]" => {
                    inside = true;
                    term_id = None;
                },
                _ if tag.starts_with('[') => inside = false,
                "id:" if inside => term_id = fields.get(1).map(|id| id.to_string()),
                "relationship:" if inside => {
                    let Some(current) = term_id.as_deref() else {
                        continue;
                    };
                    let (Some(&keyword), Some(&target)) = (fields.get(1), fields.get(2)) else {
                        warn!("Incomplete taxon relationship on term {}", current);
                        continue;
                    };
                    let relationship = keyword.parse::<TaxonRelationship>().map_err(|_| {
                        OntologyError::MalformedRelationship {
                            term_id: current.to_string(),
                            relationship: keyword.to_string(),
                        }
                    })?;

                    let Some(taxa) = constraint_taxa(target, &fields, oracle) else {
                        warn!("Unrecognized taxon reference {} on term {}", target, current);
                        continue;
                    };

                    let current = current.to_string();
                    report.constraints += 1;
                    report.invalidated_terms +=
                        self.restrict_taxon(&taxa, &current, relationship, oracle)?;
                },
                _ => {},
            }
        }

        info!(
            "Applied {} taxon constraints, {} terms invalidated",
            report.constraints, report.invalidated_terms
        );
        Ok(report)
    }

    /// Apply `term\trelationship\ttaxon` constraint lines. `#` lines are
    /// comments; the taxon may carry an `NCBITaxon:` prefix.
    pub fn apply_additional_taxon_constraints<R: BufRead>(
        &mut self,
        reader: R,
        oracle: &dyn TaxonLineage,
    ) -> Result<TaxonReport> {
        let mut report = TaxonReport::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            let (Some(&term_id), Some(&keyword), Some(&taxon)) =
                (fields.first(), fields.get(1), fields.get(2))
            else {
                warn!("Skipping taxon constraint line {}: expected 3 columns", index + 1);
                continue;
            };

            let relationship = keyword.parse::<TaxonRelationship>().map_err(|_| {
                OntologyError::MalformedRelationship {
                    term_id: term_id.to_string(),
                    relationship: keyword.to_string(),
                }
            })?;
            let taxon = taxon
                .strip_prefix(NCBI_TAXON)
                .and_then(|rest| rest.strip_prefix(':'))
                .unwrap_or(taxon);

            report.constraints += 1;
            report.invalidated_terms +=
                self.restrict_taxon(&[taxon.to_string()], term_id, relationship, oracle)?;
        }

        info!(
            "Applied {} additional taxon constraints, {} terms invalidated",
            report.constraints, report.invalidated_terms
        );
        Ok(report)
    }
}

/// Taxon ids named by a constraint target such as `NCBITaxon:9606` or
/// `NCBITaxon_Union:0000023 ! Bacteria or Archaea`
fn constraint_taxa(target: &str, fields: &[&str], oracle: &dyn TaxonLineage) -> Option<Vec<String>> {
    let (prefix, id) = target.split_once(':')?;
    match prefix {
        NCBI_TAXON => Some(vec![id.to_string()]),
        NCBI_TAXON_UNION => {
            let mut taxa = Vec::new();
            for name in fields.iter().skip(4).filter(|name| **name != "or") {
                let resolved = oracle.resolve_name(name);
                if resolved.is_empty() {
                    error!("Missing NCBI tax ID: {}", name);
                }
                taxa.extend(resolved);
            }
            Some(taxa)
        },
        _ => None,
    }
}
