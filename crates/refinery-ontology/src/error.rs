//! Error types for the ontology engine

/// Result type for ontology operations
pub type Result<T> = std::result::Result<T, OntologyError>;

/// Error types raised by the ontology engine
#[derive(Debug, thiserror::Error)]
pub enum OntologyError {
    /// The OBO source could not be opened or fetched
    #[error("Source unavailable: {location} ({reason})")]
    SourceUnavailable { location: String, reason: String },

    #[error("Unknown term: {0}")]
    UnknownTerm(String),

    /// A taxon constraint used a relationship other than only_in_taxon / never_in_taxon
    #[error("Malformed relationship '{relationship}' on term {term_id}")]
    MalformedRelationship {
        term_id: String,
        relationship: String,
    },

    /// The graph contains a cycle through the named term
    #[error("Malformed ontology: cycle detected through term {term_id}")]
    MalformedOntology { term_id: String },

    #[error("Unknown taxon: {0}")]
    UnknownTaxon(String),

    #[error("No organism taxon has been set on this ontology")]
    OrganismTaxonNotSet,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl OntologyError {
    pub(crate) fn cycle(term_id: impl Into<String>) -> Self {
        OntologyError::MalformedOntology {
            term_id: term_id.into(),
        }
    }
}
