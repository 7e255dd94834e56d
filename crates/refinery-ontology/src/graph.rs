//! Ontology graph: term table, head list, alt-id table and traversals

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::annotation::Annotation;
use crate::association::AnnotationRecord;
use crate::idmap::IdMap;
use crate::term::Term;

/// In-memory ontology DAG.
///
/// Terms are stored by canonical id; alternate ids resolve through a separate
/// table. All structural edits go through this type so that `parent_of` and
/// `child_of` stay symmetric.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    pub(crate) terms: BTreeMap<String, Term>,
    pub(crate) heads: Vec<String>,
    pub(crate) alt_ids: HashMap<String, String>,
    pub(crate) obsolete: HashSet<String>,
    pub(crate) organism_taxon: Option<String>,
    pub(crate) summarized_organisms: Vec<String>,
}

/// Outcome of loading association records into an ontology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateStats {
    pub added: usize,
    pub unknown_terms: usize,
}

impl Ontology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterate `(id, term)` pairs in id order
    pub fn terms(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.terms.iter().map(|(id, term)| (id.as_str(), term))
    }

    /// Ids of the root terms, in discovery order
    pub fn head_ids(&self) -> &[String] {
        &self.heads
    }

    pub fn heads(&self) -> impl Iterator<Item = &Term> {
        self.heads.iter().filter_map(|id| self.terms.get(id))
    }

    /// NCBI taxon id the taxon restrictions are evaluated against
    pub fn organism_taxon(&self) -> Option<&str> {
        self.organism_taxon.as_deref()
    }

    /// Organisms recorded by [`Ontology::summarize`], in call order
    pub fn summarized_organisms(&self) -> &[String] {
        &self.summarized_organisms
    }

    /// Map an id (canonical or alternate) to the canonical id of a live term
    pub fn resolve_id<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        if let Some((canonical, _)) = self.terms.get_key_value(id) {
            return Some(canonical.as_str());
        }
        self.alt_ids
            .get(id)
            .filter(|canonical| self.terms.contains_key(canonical.as_str()))
            .map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resolve_id(id).is_some()
    }

    /// Look up a term by canonical or alternate id.
    ///
    /// A miss is logged and returned as `None`; obsolete terms are never found.
    pub fn get_term(&self, id: &str) -> Option<&Term> {
        match self.resolve_id(id) {
            Some(canonical) => self.terms.get(canonical),
            None => {
                warn!("Term {} does not exist", id);
                None
            }
        }
    }

    /// Mutable lookup. Edges are not reachable through [`Term`]'s public API,
    /// so handing out `&mut Term` cannot break edge symmetry.
    pub fn get_term_mut(&mut self, id: &str) -> Option<&mut Term> {
        let canonical = match self.resolve_id(id) {
            Some(canonical) => canonical.to_string(),
            None => {
                warn!("Term {} does not exist", id);
                return None;
            }
        };
        self.terms.get_mut(&canonical)
    }

    /// Terms for the given ids (or every term when `ids` is `None`), optionally
    /// restricted to one namespace. Unknown ids are skipped.
    pub fn get_terms(&self, ids: Option<&[String]>, namespace: Option<&str>) -> Vec<&Term> {
        let in_namespace =
            |term: &&Term| namespace.is_none_or(|ns| term.namespace() == Some(ns));

        match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.get_term(id))
                .filter(in_namespace)
                .collect(),
            None => self.terms.values().filter(in_namespace).collect(),
        }
    }

    // ========================================================================
    // Structural edits
    // ========================================================================

    /// Fetch the term for `id`, creating a head placeholder if unseen
    pub(crate) fn get_or_insert(&mut self, id: &str) -> &mut Term {
        self.terms
            .entry(id.to_string())
            .or_insert_with(|| Term::new(id))
    }

    /// Wire `child -> parent` in both directions
    pub(crate) fn link(&mut self, child_id: &str, parent_id: &str) {
        if let Some(parent) = self.terms.get_mut(parent_id) {
            parent.parent_of.insert(child_id.to_string());
        }
        if let Some(child) = self.terms.get_mut(child_id) {
            child.child_of.insert(parent_id.to_string());
            child.is_head = false;
        }
    }

    /// Remove the `child -> parent` edge in both directions
    pub(crate) fn unlink(&mut self, child_id: &str, parent_id: &str) {
        if let Some(parent) = self.terms.get_mut(parent_id) {
            parent.parent_of.remove(child_id);
        }
        if let Some(child) = self.terms.get_mut(child_id) {
            child.forget_parent(parent_id);
        }
    }

    pub(crate) fn register_alt_id(&mut self, alt_id: &str, canonical: &str) {
        if let Some(previous) = self
            .alt_ids
            .insert(alt_id.to_string(), canonical.to_string())
        {
            if previous != canonical {
                warn!(
                    "Alt id {} moved from {} to {}",
                    alt_id, previous, canonical
                );
            }
        }
    }

    /// Remove a term from the graph and from every neighbor's edge sets.
    ///
    /// Its alternate ids are unregistered. Children left without any parent
    /// become heads.
    pub(crate) fn detach(&mut self, id: &str) -> Option<Term> {
        let term = self.terms.remove(id)?;

        for parent_id in &term.child_of {
            if let Some(parent) = self.terms.get_mut(parent_id) {
                parent.parent_of.remove(id);
            }
        }

        for child_id in &term.parent_of {
            if let Some(child) = self.terms.get_mut(child_id) {
                child.forget_parent(id);
                if child.child_of.is_empty() {
                    debug!("Term {} re-headed after removing {}", child_id, id);
                    child.is_head = true;
                    if !self.heads.iter().any(|h| h == child_id) {
                        self.heads.push(child_id.clone());
                    }
                }
            }
        }

        self.alt_ids.retain(|_, canonical| canonical != id);
        self.heads.retain(|h| h != id);
        Some(term)
    }

    // ========================================================================
    // Traversals
    // ========================================================================

    /// Descendants of `id` that share their parent's namespace.
    ///
    /// A child in another namespace is skipped along with everything below it.
    pub fn get_descendants(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let Some(root) = self.get_term(id) else {
            return seen;
        };

        let mut stack: Vec<&Term> = vec![root];
        while let Some(parent) = stack.pop() {
            for child_id in &parent.parent_of {
                let Some(child) = self.terms.get(child_id) else {
                    continue;
                };
                if child.namespace != parent.namespace || !seen.insert(child_id.clone()) {
                    continue;
                }
                stack.push(child);
            }
        }
        seen
    }

    /// Every term reachable through `parent_of` edges regardless of
    /// namespace, excluding `id` itself unless the graph loops back to it.
    pub(crate) fn subtree_ids(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let Some(root) = self.get_term(id) else {
            return seen;
        };

        let mut stack: Vec<&str> = root.parent_of.iter().map(String::as_str).collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.to_string()) {
                continue;
            }
            if let Some(term) = self.terms.get(current) {
                stack.extend(term.parent_of.iter().map(String::as_str));
            }
        }
        seen
    }

    /// Ancestors of `id` that share its namespace
    pub fn get_ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut ancestors = BTreeSet::new();
        let Some(root) = self.get_term(id) else {
            return ancestors;
        };
        let namespace = root.namespace.as_deref();

        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = root.child_of.iter().map(String::as_str).collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(term) = self.terms.get(current) else {
                continue;
            };
            if term.namespace.as_deref() != namespace {
                continue;
            }
            ancestors.insert(current.to_string());
            stack.extend(term.child_of.iter().map(String::as_str));
        }
        ancestors
    }

    /// Terms without children, optionally in one namespace, having at least
    /// `min_annotations` annotations
    pub fn get_leaves(&self, namespace: Option<&str>, min_annotations: usize) -> Vec<&Term> {
        self.terms
            .values()
            .filter(|term| term.parent_of.is_empty())
            .filter(|term| namespace.is_none_or(|ns| term.namespace() == Some(ns)))
            .filter(|term| term.annotations.len() >= min_annotations)
            .collect()
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    /// Attach an annotation to a term, resolving alternate ids.
    ///
    /// Returns `false` when the term is unknown.
    pub fn add_annotation(&mut self, term_id: &str, annotation: Annotation) -> bool {
        match self.get_term_mut(term_id) {
            Some(term) => {
                term.annotations.insert(annotation);
                true
            }
            None => false,
        }
    }

    /// Load parsed association records as direct annotations
    pub fn populate_annotations<I>(&mut self, records: I) -> PopulateStats
    where
        I: IntoIterator<Item = AnnotationRecord>,
    {
        let mut stats = PopulateStats::default();
        for record in records {
            let term_id = record.term_id.clone();
            if self.add_annotation(&term_id, record.into_annotation()) {
                stats.added += 1;
            } else {
                stats.unknown_terms += 1;
            }
        }

        info!(
            "Populated {} annotations ({} referenced unknown terms)",
            stats.added, stats.unknown_terms
        );
        stats
    }

    /// Rewrite every annotation's gene id through `id_map`.
    ///
    /// A gene mapping to several ids yields one annotation per id. Unmapped
    /// genes are dropped.
    pub fn map_genes(&mut self, id_map: &IdMap) {
        let mut unmapped = BTreeSet::new();

        for term in self.terms.values_mut() {
            let current = std::mem::take(&mut term.annotations);
            for annotation in current {
                match id_map.get(annotation.gene_id()) {
                    Some(mapped) => {
                        for gene_id in mapped {
                            term.annotations.insert(annotation.remapped(gene_id.as_str()));
                        }
                    }
                    None => {
                        unmapped.insert(annotation.gene_id().to_string());
                    }
                }
            }
        }

        if !unmapped.is_empty() {
            warn!("Dropped {} unmapped gene ids", unmapped.len());
            debug!("Unmapped gene ids: {:?}", unmapped);
        }
    }
}
