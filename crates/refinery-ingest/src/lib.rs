//! Refinery Ingest
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Turns Gene Ontology and Disease Ontology sources into gene set records.
//!
//! # Overview
//!
//! - [`config`]: `REFINERY_*` environment configuration with builder and presets
//! - [`downloader`]: HTTP downloads with retry, backoff and gzip handling
//! - [`go`]: GO pipeline from OBO and association files to gene sets
//! - [`disease`]: Disease Ontology gene sets from OMIM cross-references
//! - [`geneset`]: titles, abstracts and slugs of gene set records
//! - [`output`]: JSON lines writer
//!
//! The ontology work itself lives in `refinery-ontology`; this crate only
//! fetches inputs and formats results.

pub mod config;
pub mod disease;
pub mod downloader;
pub mod error;
pub mod geneset;
pub mod go;
pub mod output;
pub mod tags;

pub use config::RefineryConfig;
pub use disease::{DiseaseGeneSource, DiseaseGeneTable};
pub use downloader::Downloader;
pub use error::{IngestError, Result};
pub use geneset::GeneSet;
pub use tags::{TagColumns, TagMap};
