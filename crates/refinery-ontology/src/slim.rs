//! Slim reduction: voting, slim selection, pruning and fringe checks

use std::collections::{BTreeSet, HashSet};
use std::io::{BufRead, Write};

use tracing::{debug, error, info, warn};

use crate::annotation::Annotation;
use crate::error::{OntologyError, Result};
use crate::graph::Ontology;
use crate::summary::AnnotationCounts;

/// Figures a prune predicate is evaluated against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneMetrics {
    /// Number of annotations on the term
    pub total: usize,
    /// Number of direct annotations on the term
    pub direct: usize,
    pub parent_count: usize,
    pub child_count: usize,
    /// Largest direct count across summarized organisms, or `direct`
    pub max_direct: usize,
    /// Largest total count across summarized organisms, or `total`
    pub max_total: usize,
}

/// Outcome of [`Ontology::prune`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub flagged: Vec<String>,
    pub removed: Vec<String>,
    pub head_edges_removed: usize,
}

/// Second column of each `name\tid` slim line
pub fn read_slim_ids<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.split('\t').nth(1).map(str::trim) {
            Some(id) if !id.is_empty() => ids.push(id.to_string()),
            _ => warn!("Slim line {} has no term id column", index + 1),
        }
    }
    Ok(ids)
}

impl Ontology {
    /// Tag each listed term and all of its descendants with `tag`.
    ///
    /// Returns the number of terms that received the vote.
    pub fn vote(&mut self, ids: &[String], tag: &str) -> usize {
        let mut targets = BTreeSet::new();
        for id in ids {
            let Some(canonical) = self.resolve_id(id).map(str::to_string) else {
                warn!("Cannot vote for unknown term {}", id);
                continue;
            };
            targets.extend(self.subtree_ids(&canonical));
            targets.insert(canonical);
        }

        for id in &targets {
            if let Some(term) = self.terms.get_mut(id) {
                term.votes.insert(tag.to_string());
            }
        }
        targets.len()
    }

    /// Terms chosen by a depth-first walk from `root_id`.
    ///
    /// A term carrying at least `min_votes` distinct votes is selected and its
    /// whole subtree is excluded; otherwise the walk continues into its
    /// children. A term selected on one branch but lying under a selection on
    /// another branch is dropped.
    pub fn select_slim(&self, root_id: &str, min_votes: usize) -> Result<BTreeSet<String>> {
        let root = self
            .resolve_id(root_id)
            .ok_or_else(|| OntologyError::UnknownTerm(root_id.to_string()))?;

        let mut selected = BTreeSet::new();
        let mut pruned = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root.to_string()];

        while let Some(id) = stack.pop() {
            if selected.contains(&id) || pruned.contains(&id) || !visited.insert(id.clone()) {
                continue;
            }
            let Some(term) = self.terms.get(&id) else {
                continue;
            };

            if term.votes.len() >= min_votes {
                pruned.extend(self.subtree_ids(&id));
                selected.insert(id);
            } else {
                stack.extend(term.parent_of.iter().cloned());
            }
        }

        Ok(selected.difference(&pruned).cloned().collect())
    }

    /// Write the slim below `root_id` as `name\tid` lines sorted by id.
    ///
    /// Returns the number of lines written.
    pub fn write_slim<W: Write>(&self, root_id: &str, min_votes: usize, out: &mut W) -> Result<usize> {
        let selected = self.select_slim(root_id, min_votes)?;
        for id in &selected {
            let name = self
                .terms
                .get(id)
                .map(|term| term.display_name())
                .unwrap_or(id.as_str());
            writeln!(out, "{}\t{}", name, id)?;
        }

        info!("Wrote {} slim terms below {}", selected.len(), root_id);
        Ok(selected.len())
    }

    /// Remove (or flag) every non-head term matching `predicate`.
    ///
    /// Metrics are taken for all terms before any change. Matching terms are
    /// spliced out: each parent is linked to each child, then the term is
    /// deleted. With `flag` set, matching terms only get the flag in their
    /// summary. Finally any term that still has a non-head parent loses its
    /// direct edges to head terms.
    pub fn prune<F>(&mut self, predicate: F, flag: Option<&str>) -> PruneReport
    where
        F: Fn(&PruneMetrics) -> bool,
    {
        let heads: BTreeSet<String> = self.heads.iter().cloned().collect();
        let organisms = self.summarized_organisms.clone();
        let mut matching = Vec::new();

        for (id, term) in self.terms.iter_mut() {
            let total = term.annotations.len();
            let direct = term.annotations.iter().filter(|a| a.is_direct()).count();
            let mut metrics = PruneMetrics {
                total,
                direct,
                parent_count: term.child_of.len(),
                child_count: term.parent_of.len(),
                max_direct: direct,
                max_total: total,
            };

            let description = term.description.clone();
            if let Some(summary) = term.summary.as_mut() {
                if !organisms.is_empty() {
                    let counts = organisms.iter().filter_map(|org| summary.organisms.get(org));
                    metrics.max_direct = counts.clone().map(|c| c.direct).max().unwrap_or_default();
                    metrics.max_total = counts.map(|c| c.total).max().unwrap_or_default();
                }
                summary.max = Some(AnnotationCounts {
                    direct: metrics.max_direct,
                    total: metrics.max_total,
                });
                if summary.description.is_none() {
                    summary.description = description;
                }
            }

            if !heads.contains(id) && predicate(&metrics) {
                matching.push(id.clone());
            }
        }

        let mut report = PruneReport::default();
        match flag {
            Some(flag) => {
                for id in &matching {
                    if let Some(term) = self.terms.get_mut(id) {
                        term.summary_mut().flags.insert(flag.to_string());
                    }
                }
                report.flagged = matching;
            },
            None => {
                for id in &matching {
                    self.splice_out(id);
                }
                report.removed = matching;
            },
        }

        report.head_edges_removed = self.drop_redundant_head_edges(&heads);
        info!(
            "Prune flagged {} and removed {} terms, {} head edges dropped",
            report.flagged.len(),
            report.removed.len(),
            report.head_edges_removed
        );
        report
    }

    fn splice_out(&mut self, id: &str) {
        let Some(term) = self.terms.get(id) else {
            return;
        };
        if term.summary.as_ref().is_some_and(|s| s.has_flag("slim")) {
            warn!("Pruned slim term: ({}) {}", id, term.display_name());
        }

        let parents: Vec<String> = term.child_of.iter().cloned().collect();
        let children: Vec<String> = term.parent_of.iter().cloned().collect();
        for parent in &parents {
            for child in &children {
                self.link(child, parent);
            }
        }
        self.detach(id);
    }

    fn drop_redundant_head_edges(&mut self, heads: &BTreeSet<String>) -> usize {
        let mut edges = Vec::new();
        for (id, term) in &self.terms {
            let to_heads: Vec<&String> = term.child_of.intersection(heads).collect();
            if to_heads.is_empty() {
                continue;
            }
            if term.child_of.iter().any(|parent| !heads.contains(parent)) {
                edges.extend(to_heads.into_iter().map(|head| (id.clone(), head.clone())));
            }
        }

        for (child, head) in &edges {
            debug!("Dropping redundant edge {} -> {}", child, head);
            self.unlink(child, head);
        }
        edges.len()
    }

    /// Check that the slim terms partition the leaves exactly.
    ///
    /// Every leaf (optionally within `namespace`) must reach exactly one slim
    /// term. The check runs on a scratch copy, so this graph is unchanged.
    pub fn check_fringe(&self, slim_ids: &[String], namespace: Option<&str>) -> Result<bool> {
        let mut scratch = self.clone();
        for term in scratch.terms.values_mut() {
            term.annotations.clear();
        }

        let mut leaf_ids: Vec<String> = scratch
            .get_leaves(namespace, 0)
            .into_iter()
            .map(|term| term.id.clone())
            .collect();
        for leaf in &leaf_ids {
            scratch.add_annotation(leaf, Annotation::builder(leaf.as_str()).build());
        }

        scratch.propagate()?;

        let mut reached = Vec::new();
        for id in slim_ids {
            let Some(term) = scratch.terms.get(scratch.resolve_id(id).unwrap_or(id)) else {
                error!("Slim term does not exist (potentially obsolete term): {}", id);
                continue;
            };
            reached.extend(term.gene_ids().into_iter().map(str::to_string));
        }

        leaf_ids.sort();
        reached.sort();
        if leaf_ids == reached {
            return Ok(true);
        }

        let reached: HashSet<&String> = reached.iter().collect();
        for leaf in &leaf_ids {
            if !reached.contains(leaf) {
                warn!("Missing leaf term: {}", leaf);
            }
        }
        Ok(false)
    }
}
