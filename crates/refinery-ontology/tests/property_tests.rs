//! Property-based tests for graph construction and propagation.
//!
//! Random DAGs are rendered to OBO text (parents always have a lower index
//! than their children, so the input is acyclic) and fed to the parser.

use std::collections::BTreeSet;

use proptest::prelude::*;
use refinery_ontology::{Annotation, OboParser, Ontology};

/// Parent links of one term: (raw parent index, relationship kind), plus an
/// obsolete marker
type TermShape = (Vec<(usize, u8)>, bool);

fn term_id(index: usize) -> String {
    format!("GO:{:07}", index)
}

fn render(shapes: &[TermShape], reverse: bool) -> String {
    let mut blocks = Vec::with_capacity(shapes.len());
    for (index, (parents, obsolete)) in shapes.iter().enumerate() {
        let mut block = format!("[Term]\nid: {}\nname: term {}\n", term_id(index), index);
        if index > 0 {
            for (raw, kind) in parents {
                let parent = term_id(raw % index);
                match kind {
                    0 => block.push_str(&format!("is_a: {} ! parent\n", parent)),
                    1 => block.push_str(&format!("relationship: part_of {} ! parent\n", parent)),
                    _ => block.push_str(&format!("relationship: regulates {} ! parent\n", parent)),
                }
            }
        }
        if *obsolete {
            block.push_str("is_obsolete: true\n");
        }
        blocks.push(block);
    }
    if reverse {
        blocks.reverse();
    }
    blocks.join("\n")
}

fn shapes() -> impl Strategy<Value = Vec<TermShape>> {
    prop::collection::vec(
        (
            prop::collection::vec((any::<usize>(), 0u8..3), 0..3),
            prop::bool::weighted(0.1),
        ),
        2..16,
    )
}

/// Structural fingerprint used to compare two graphs
type Snapshot = Vec<(String, Vec<String>, Vec<String>, Vec<String>, Vec<String>, bool)>;

fn snapshot(ontology: &Ontology) -> (Snapshot, BTreeSet<String>) {
    let terms = ontology
        .terms()
        .map(|(id, term)| {
            (
                id.to_string(),
                term.parent_of().iter().cloned().collect(),
                term.child_of().iter().cloned().collect(),
                term.regulates().iter().cloned().collect(),
                term.part_of().iter().cloned().collect(),
                term.is_head(),
            )
        })
        .collect();
    let heads = ontology.head_ids().iter().cloned().collect();
    (terms, heads)
}

proptest! {
    /// B in A.parent_of exactly when A in B.child_of, with no dangling ids
    #[test]
    fn prop_edges_are_symmetric(shapes in shapes(), reverse in any::<bool>()) {
        let ontology = Ontology::from_obo_str(&render(&shapes, reverse)).unwrap();

        for (id, term) in ontology.terms() {
            for child in term.parent_of() {
                let child_term = ontology.get_term(child);
                prop_assert!(child_term.is_some(), "dangling child {} of {}", child, id);
                prop_assert!(child_term.unwrap().child_of().contains(id));
            }
            for parent in term.child_of() {
                let parent_term = ontology.get_term(parent);
                prop_assert!(parent_term.is_some(), "dangling parent {} of {}", parent, id);
                prop_assert!(parent_term.unwrap().parent_of().contains(id));
            }
            prop_assert!(term.regulates().is_subset(term.child_of()));
            prop_assert!(term.part_of().is_subset(term.child_of()));
        }
    }

    /// Heads are exactly the terms without parents
    #[test]
    fn prop_heads_have_no_parents(shapes in shapes(), reverse in any::<bool>()) {
        let ontology = Ontology::from_obo_str(&render(&shapes, reverse)).unwrap();
        let heads: BTreeSet<&str> = ontology.head_ids().iter().map(String::as_str).collect();

        for (id, term) in ontology.terms() {
            prop_assert_eq!(term.is_head(), term.child_of().is_empty(), "term {}", id);
            prop_assert_eq!(term.is_head(), heads.contains(id), "term {}", id);
        }
    }

    /// Parsing the same text twice gives the same graph, whether into a fresh
    /// graph or on top of the first result
    #[test]
    fn prop_parsing_is_idempotent(shapes in shapes(), reverse in any::<bool>()) {
        let text = render(&shapes, reverse);
        let first = Ontology::from_obo_str(&text).unwrap();
        let second = Ontology::from_obo_str(&text).unwrap();
        prop_assert_eq!(snapshot(&first), snapshot(&second));

        let again = OboParser::with_ontology(first.clone()).parse(text.as_bytes()).unwrap();
        prop_assert_eq!(snapshot(&first), snapshot(&again));
    }

    /// Propagation never removes annotations, and non-regulates edges carry
    /// every gene of the child
    #[test]
    fn prop_propagation_is_monotone(shapes in shapes()) {
        let mut ontology = Ontology::from_obo_str(&render(&shapes, false)).unwrap();
        let ids: Vec<String> = ontology.terms().map(|(id, _)| id.to_string()).collect();
        for id in &ids {
            let gene = format!("G{}", id);
            ontology.add_annotation(id, Annotation::builder(gene).direct(true).build());
        }
        let before = ontology.clone();

        ontology.propagate().unwrap();

        for (id, term) in ontology.terms() {
            let old = before.get_term(id).unwrap();
            prop_assert!(old.annotations().is_subset(term.annotations()));

            for child_id in term.parent_of() {
                let child = ontology.get_term(child_id).unwrap();
                if !child.regulates().contains(id) {
                    prop_assert!(child.gene_ids().is_subset(&term.gene_ids()),
                        "{} -> {} lost genes", child_id, id);
                }
            }
        }
    }
}
