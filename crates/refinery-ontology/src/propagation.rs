//! Upward annotation propagation
//!
//! Annotations flow from children to parents in post-order. An annotation may
//! cross at most one `regulates` or `part_of` edge: crossing one sets its
//! cutoff flag, and a flagged annotation is not carried across a further
//! `regulates` edge. `part_of` edges carry flagged annotations.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::annotation::Annotation;
use crate::error::{OntologyError, Result};
use crate::graph::Ontology;
use crate::term::Term;

/// How a child reaches one particular parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Regulates,
    PartOf,
    IsA,
}

impl EdgeKind {
    fn between(child: &Term, parent_id: &str) -> Self {
        if child.regulates.contains(parent_id) {
            EdgeKind::Regulates
        } else if child.part_of.contains(parent_id) {
            EdgeKind::PartOf
        } else {
            EdgeKind::IsA
        }
    }

    /// Copy of `annotation` as seen from the parent, or `None` if it stops here
    fn carry(self, annotation: &Annotation) -> Option<Annotation> {
        match self {
            EdgeKind::Regulates if annotation.is_ready_regulates_cutoff() => None,
            EdgeKind::Regulates | EdgeKind::PartOf => Some(annotation.propagated(Some(true))),
            EdgeKind::IsA => Some(annotation.propagated(None)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl Ontology {
    /// Merge every term's annotations into all of its ancestors.
    ///
    /// Each term is merged once, after all of its children. A cycle in the
    /// graph fails with [`OntologyError::MalformedOntology`], including one
    /// that no head reaches.
    pub fn propagate(&mut self) -> Result<()> {
        info!("Propagating annotations from {} heads", self.heads.len());

        let heads = self.heads.clone();
        let mut state: HashMap<String, Visit> = HashMap::with_capacity(self.terms.len());
        for head in &heads {
            debug!("Propagating {}", head);
            self.propagate_from(head, &mut state)?;
        }

        // terms no head reaches sit on or under a cycle
        let unvisited: Vec<String> = self
            .terms
            .keys()
            .filter(|id| !state.contains_key(*id))
            .cloned()
            .collect();
        for id in unvisited {
            if state.contains_key(&id) {
                continue;
            }
            let parentless = self.terms.get(&id).is_some_and(|t| t.child_of.is_empty());
            if !parentless {
                return Err(OntologyError::cycle(id));
            }
            self.propagate_from(&id, &mut state)?;
        }
        Ok(())
    }

    fn propagate_from(&mut self, root: &str, state: &mut HashMap<String, Visit>) -> Result<()> {
        let mut stack: Vec<(String, bool)> = vec![(root.to_string(), false)];

        while let Some((id, children_done)) = stack.pop() {
            if children_done {
                self.merge_children_into(&id);
                state.insert(id, Visit::Done);
                continue;
            }

            match state.get(&id) {
                Some(Visit::Done) => continue,
                Some(Visit::InProgress) => return Err(OntologyError::cycle(id)),
                None => {},
            }

            let Some(term) = self.terms.get(&id) else {
                continue;
            };
            let children: Vec<String> = term.parent_of.iter().cloned().collect();

            state.insert(id.clone(), Visit::InProgress);
            stack.push((id, true));
            for child in children {
                match state.get(&child) {
                    Some(Visit::Done) => {},
                    Some(Visit::InProgress) => return Err(OntologyError::cycle(child)),
                    None => stack.push((child, false)),
                }
            }
        }
        Ok(())
    }

    fn merge_children_into(&mut self, parent_id: &str) {
        let Some(parent) = self.terms.get(parent_id) else {
            return;
        };

        let mut incoming = BTreeSet::new();
        for child_id in &parent.parent_of {
            let Some(child) = self.terms.get(child_id) else {
                continue;
            };
            let edge = EdgeKind::between(child, parent_id);
            incoming.extend(child.annotations.iter().filter_map(|a| edge.carry(a)));
        }

        if let Some(parent) = self.terms.get_mut(parent_id) {
            parent.annotations.extend(incoming);
        }
    }
}
