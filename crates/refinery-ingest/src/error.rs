//! Error types for the ingestion pipeline

use refinery_common::RefineryError;
use refinery_ontology::OntologyError;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Ontology error: {0}")]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    Common(#[from] RefineryError),

    #[error("Download error: {0}")]
    Download(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tag mapping error: {0}")]
    TagMapping(#[from] csv::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    /// A GO term outside the three GO namespaces cannot be titled
    #[error("Term {term_id} has unsupported namespace '{namespace}'")]
    UnsupportedNamespace { term_id: String, namespace: String },
}

impl From<tempfile::PersistError> for IngestError {
    fn from(err: tempfile::PersistError) -> Self {
        IngestError::Io(err.error)
    }
}
