//! Term to gene set tag mapping files

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;

/// Zero-based columns of a tab-separated tag mapping file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagColumns {
    pub term: usize,
    pub tags: usize,
}

impl Default for TagColumns {
    fn default() -> Self {
        TagColumns { term: 0, tags: 1 }
    }
}

/// Tags to attach to the gene set of each term
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    tags: BTreeMap<String, Vec<String>>,
}

impl TagMap {
    /// Read a tab-separated mapping. The tag column holds a comma or
    /// semicolon separated list; repeated term rows accumulate.
    pub fn from_reader<R: Read>(reader: R, columns: TagColumns, has_header: bool) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(has_header)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut tags: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let (Some(term), Some(list)) = (record.get(columns.term), record.get(columns.tags)) else {
                warn!("Skipping tag mapping row {} with {} columns", index + 1, record.len());
                continue;
            };

            let entry = tags.entry(term.trim().to_string()).or_default();
            for tag in list.split([',', ';']).map(str::trim).filter(|t| !t.is_empty()) {
                if !entry.iter().any(|existing| existing == tag) {
                    entry.push(tag.to_string());
                }
            }
        }

        info!("Loaded tags for {} terms", tags.len());
        Ok(TagMap { tags })
    }

    pub fn from_path(path: impl AsRef<Path>, columns: TagColumns, has_header: bool) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, columns, has_header)
    }

    pub fn get(&self, term_id: &str) -> &[String] {
        self.tags.get(term_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_tag_map_with_header() {
        let data = "doid\tname\ttags\nDOID:9351\tdiabetes mellitus\tendocrine, metabolic\n\
                    # retired row\nDOID:9351\tdiabetes mellitus\tmetabolic;chronic\nDOID:1\tshort\n";
        let tags = TagMap::from_reader(data.as_bytes(), TagColumns { term: 0, tags: 2 }, true).unwrap();

        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("DOID:9351"), ["endocrine", "metabolic", "chronic"]);
        assert!(tags.get("DOID:1").is_empty());
    }

    #[test]
    fn test_tag_map_default_columns() {
        let tags = TagMap::from_reader("GO:0000005\tfootball\n".as_bytes(), TagColumns::default(), false)
            .unwrap();
        assert_eq!(tags.get("GO:0000005"), ["football"]);
    }
}
