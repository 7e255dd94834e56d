//! Refinery Ontology
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! In-memory ontology graph engine used to turn OBO ontologies (Gene Ontology,
//! Disease Ontology) plus gene association files into propagated gene sets.
//!
//! # Overview
//!
//! - [`Ontology`]: owns every [`Term`], the head list and the alt-id table
//! - [`OboParser`]: single forward pass over an OBO stream building the graph
//! - [`Ontology::propagate`]: upward merge of [`Annotation`]s honoring the
//!   one-crossing rule for `regulates` and `part_of` edges
//! - [`taxon`]: `only_in_taxon` / `never_in_taxon` invalidation against a
//!   [`TaxonLineage`] oracle
//! - [`slim`]: voting, slim selection, pruning and fringe checks
//!
//! The engine is synchronous and single-threaded. One [`Ontology`] holds one
//! DAG for one processing pass; nothing is shared between instances.
//!
//! # Example
//!
//! ```
//! use refinery_ontology::{Annotation, Ontology};
//!
//! let obo = "[Term]\nid: GO:0000001\nname: root\n\n[Term]\nid: GO:0000002\nname: leaf\nis_a: GO:0000001\n";
//! let mut ontology = Ontology::from_obo_str(obo).unwrap();
//!
//! ontology.add_annotation("GO:0000002", Annotation::builder("G1").direct(true).build());
//! ontology.propagate().unwrap();
//!
//! let root = ontology.get_term("GO:0000001").unwrap();
//! assert_eq!(root.annotations().len(), 1);
//! assert!(!root.annotations().iter().next().unwrap().is_direct());
//! ```

pub mod annotation;
pub mod association;
pub mod error;
pub mod graph;
pub mod idmap;
pub mod parser;
pub mod propagation;
pub mod slim;
pub mod summary;
pub mod taxon;
pub mod term;

pub use annotation::{Annotation, AnnotationBuilder};
pub use association::{AnnotationRecord, GafColumns, GafReader};
pub use error::{OntologyError, Result};
pub use graph::{Ontology, PopulateStats};
pub use idmap::IdMap;
pub use parser::OboParser;
pub use slim::{PruneMetrics, PruneReport};
pub use summary::{AnnotationCounts, TermSummary};
pub use taxon::{TaxonLineage, TaxonRelationship, TaxonReport, TaxonomyTree};
pub use term::Term;
