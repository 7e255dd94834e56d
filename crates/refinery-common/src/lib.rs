//! Refinery Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities and error handling for the gene set refinery.
//!
//! # Overview
//!
//! This crate provides common functionality used across all refinery workspace members:
//!
//! - **Error Handling**: Shared error type and result alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Text**: Slug and token normalization used for term names and gene set slugs
//!
//! # Example
//!
//! ```no_run
//! use refinery_common::logging::{init_logging, LogConfig};
//! use refinery_common::text::slugify;
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     assert_eq!(slugify("DOID:0014667-Homo sapiens"), "doid0014667-homo-sapiens");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod text;

// Re-export commonly used types
pub use error::{RefineryError, Result};
