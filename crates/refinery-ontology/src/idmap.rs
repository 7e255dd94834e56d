//! Tab-separated identifier mapping

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{OntologyError, Result};

/// Key to one-or-more values mapping read from `key\tvalue\tvalue...` lines.
///
/// Keys and values are upper-cased on load and lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    entries: HashMap<String, Vec<String>>,
}

impl IdMap {
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = HashMap::new();

        for line in reader.lines() {
            let line = line?.trim().to_uppercase();
            let mut tokens = line.split('\t');
            let Some(key) = tokens.next().filter(|key| !key.is_empty()) else {
                continue;
            };
            let values: Vec<String> = tokens.map(str::to_string).collect();
            if values.is_empty() {
                continue;
            }
            entries.insert(key.to_string(), values);
        }

        info!("Loaded {} id mappings", entries.len());
        Ok(Self { entries })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| OntologyError::SourceUnavailable {
            location: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Mapped ids for `id`, or `None` with a warning when there is no entry
    pub fn get(&self, id: &str) -> Option<&[String]> {
        let found = self.entries.get(&id.to_uppercase()).map(Vec::as_slice);
        if found.is_none() {
            warn!("No match for {}", id);
        }
        found
    }
}
