//! Gene association file (GAF) reader
//!
//! Produces [`AnnotationRecord`]s that [`crate::Ontology::populate_annotations`]
//! turns into direct annotations.

use std::collections::BTreeSet;
use std::io::BufRead;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::annotation::Annotation;
use crate::error::{OntologyError, Result};

/// One accepted association line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub xrdb: String,
    pub xrid: String,
    pub term_id: String,
    /// PubMed id taken from the reference column
    pub reference: Option<String>,
    pub evidence: Option<String>,
    pub date: Option<NaiveDate>,
    pub taxon: Option<String>,
}

impl AnnotationRecord {
    /// Direct annotation for this record's gene
    pub fn into_annotation(self) -> Annotation {
        let mut builder = Annotation::builder(self.xrid)
            .xrdb(self.xrdb)
            .direct(true);
        if let Some(reference) = self.reference {
            builder = builder.reference(reference);
        }
        if let Some(evidence) = self.evidence {
            builder = builder.evidence(evidence);
        }
        if let Some(date) = self.date {
            builder = builder.date(date);
        }
        builder.build()
    }
}

/// Zero-based column positions of a tab-separated association file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GafColumns {
    pub xrdb: usize,
    pub gene: usize,
    pub qualifier: usize,
    pub term: usize,
    pub reference: usize,
    pub evidence: usize,
    pub taxon: usize,
    pub date: usize,
}

impl Default for GafColumns {
    fn default() -> Self {
        Self {
            xrdb: 0,
            gene: 1,
            qualifier: 3,
            term: 4,
            reference: 5,
            evidence: 6,
            taxon: 12,
            date: 13,
        }
    }
}

impl GafColumns {
    fn required_len(&self) -> usize {
        [self.xrdb, self.gene, self.qualifier, self.term, self.evidence]
            .into_iter()
            .max()
            .unwrap_or_default()
            + 1
    }
}

/// Filtering reader for GAF-like association files
#[derive(Debug, Clone, Default)]
pub struct GafReader {
    columns: GafColumns,
    accepted_evidence: Option<BTreeSet<String>>,
}

impl GafReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(mut self, columns: GafColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Only keep lines whose evidence code is in `codes`
    pub fn with_evidence_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_evidence = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Read every accepted record. Malformed lines are skipped with a warning.
    pub fn read<R: BufRead>(&self, reader: R) -> Result<Vec<AnnotationRecord>> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut malformed = 0usize;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            match self.parse_line(&line) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => skipped += 1,
                Err(e) => {
                    warn!("Skipping association line {}: {}", index + 1, e);
                    malformed += 1;
                },
            }
        }

        info!(
            "Parsed {} annotations ({} filtered, {} malformed)",
            records.len(),
            skipped,
            malformed
        );
        Ok(records)
    }

    /// Parse one line.
    ///
    /// Returns `Ok(None)` for comments, blank lines, `NOT` qualified lines and
    /// evidence codes outside the accepted set.
    pub fn parse_line(&self, line: &str) -> Result<Option<AnnotationRecord>> {
        if line.starts_with('!') || line.trim().is_empty() {
            return Ok(None);
        }

        let columns: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        let required = self.columns.required_len();
        if columns.len() < required {
            return Err(OntologyError::Parse(format!(
                "expected at least {} columns, got {}",
                required,
                columns.len()
            )));
        }

        let field = |index: usize| {
            columns
                .get(index)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let qualifier = field(self.columns.qualifier).unwrap_or_default();
        if qualifier.split('|').any(|q| q == "NOT") {
            debug!("Skipping NOT annotation: {}", line);
            return Ok(None);
        }

        let evidence = field(self.columns.evidence);
        if let Some(accepted) = &self.accepted_evidence {
            if !evidence.is_some_and(|code| accepted.contains(code)) {
                return Ok(None);
            }
        }

        let (Some(xrdb), Some(xrid), Some(term_id)) = (
            field(self.columns.xrdb),
            field(self.columns.gene),
            field(self.columns.term),
        ) else {
            return Err(OntologyError::Parse(
                "missing database, gene or term column".to_string(),
            ));
        };

        Ok(Some(AnnotationRecord {
            xrdb: xrdb.to_string(),
            xrid: xrid.to_string(),
            term_id: term_id.to_string(),
            reference: field(self.columns.reference).and_then(extract_pubmed_id),
            evidence: evidence.map(str::to_string),
            date: field(self.columns.date).and_then(parse_date),
            taxon: field(self.columns.taxon).and_then(parse_taxon),
        }))
    }
}

/// Last `PMID:` entry of a pipe-delimited reference column, without the prefix
pub fn extract_pubmed_id(refstring: &str) -> Option<String> {
    refstring
        .split('|')
        .rev()
        .find_map(|reference| reference.strip_prefix("PMID:"))
        .map(str::to_string)
}

/// Parse date from "YYYYMMDD" format
fn parse_date(date_str: &str) -> Option<NaiveDate> {
    if date_str.len() != 8 {
        return None;
    }

    let year = date_str.get(0..4)?.parse::<i32>().ok()?;
    let month = date_str.get(4..6)?.parse::<u32>().ok()?;
    let day = date_str.get(6..8)?.parse::<u32>().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// First taxon of a "taxon:9606|taxon:10090" column
fn parse_taxon(taxon_str: &str) -> Option<String> {
    taxon_str
        .split('|')
        .next()
        .and_then(|s| s.strip_prefix("taxon:"))
        .map(str::to_string)
}
