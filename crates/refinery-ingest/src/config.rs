//! Pipeline configuration
//!
//! Values come from `REFINERY_*` environment variables (a `.env` file is
//! honored), the builder, or one of the organism presets. CLI flags are
//! applied on top by the binary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_ORGANISM: &str = "Homo sapiens";
pub const DEFAULT_TAXON_ID: &str = "9606";
pub const DEFAULT_GO_OBO_URL: &str = "http://purl.obolibrary.org/obo/go/go-basic.obo";
pub const DEFAULT_DO_OBO_URL: &str = "http://purl.obolibrary.org/obo/doid.obo";
pub const DEFAULT_XRDB: &str = "Entrez";
pub const DEFAULT_DOWNLOAD_FOLDER: &str = "./downloads";

/// Experimental evidence codes accepted unless configured otherwise
pub const DEFAULT_EVIDENCE_CODES: [&str; 6] = ["EXP", "IDA", "IPI", "IMP", "IGI", "IEP"];

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-attempt download timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Settings for one organism's processing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineryConfig {
    /// Scientific name written on every gene set
    pub organism: String,
    /// NCBI taxon id used for taxon restriction
    pub taxon_id: Option<String>,
    /// GO OBO file, local path or URL
    pub go_obo_source: String,
    /// GAF association file, local path or URL
    pub association_file: Option<String>,
    /// Empty means every evidence code is accepted
    pub evidence_codes: Vec<String>,
    /// Disease Ontology OBO file, local path or URL
    pub do_obo_source: String,
    pub xrdb: String,
    /// Tab-separated gene id mapping applied after loading associations
    pub id_map_file: Option<PathBuf>,
    pub tag_mapping_file: Option<PathBuf>,
    /// NCBI taxonomy `nodes.dmp`
    pub taxonomy_nodes: Option<PathBuf>,
    /// NCBI taxonomy `names.dmp`
    pub taxonomy_names: Option<PathBuf>,
    /// Taxon constraint OBO file (`only_in_taxon` / `never_in_taxon`)
    pub taxon_constraints: Option<PathBuf>,
    pub download_folder: PathBuf,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// JSON lines destination; stdout when unset
    pub output: Option<PathBuf>,
}

impl Default for RefineryConfig {
    fn default() -> Self {
        RefineryConfig {
            organism: DEFAULT_ORGANISM.to_string(),
            taxon_id: Some(DEFAULT_TAXON_ID.to_string()),
            go_obo_source: DEFAULT_GO_OBO_URL.to_string(),
            association_file: None,
            evidence_codes: DEFAULT_EVIDENCE_CODES.iter().map(|c| c.to_string()).collect(),
            do_obo_source: DEFAULT_DO_OBO_URL.to_string(),
            xrdb: DEFAULT_XRDB.to_string(),
            id_map_file: None,
            tag_mapping_file: None,
            taxonomy_nodes: None,
            taxonomy_names: None,
            taxon_constraints: None,
            download_folder: PathBuf::from(DEFAULT_DOWNLOAD_FOLDER),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output: None,
        }
    }
}

impl RefineryConfig {
    pub fn builder() -> RefineryConfigBuilder {
        RefineryConfigBuilder::default()
    }

    /// Whether `source` should be fetched over the network
    pub fn is_remote(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    /// Last path segment of a URL, used as the downloaded file name
    pub fn file_name_for(source: &str) -> &str {
        let without_query = source.split(['?', '#']).next().unwrap_or(source);
        without_query
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(without_query)
    }

    /// Where `source` lives on disk once fetched: inside the download folder
    /// for URLs, the path itself otherwise
    pub fn local_path_for(&self, source: &str) -> PathBuf {
        if Self::is_remote(source) {
            self.download_folder.join(Self::file_name_for(source))
        } else {
            PathBuf::from(source)
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.organism.trim().is_empty() {
            return Err("organism cannot be empty".to_string());
        }
        if self.go_obo_source.is_empty() {
            return Err("go_obo_source cannot be empty".to_string());
        }
        if self.do_obo_source.is_empty() {
            return Err("do_obo_source cannot be empty".to_string());
        }
        if self.xrdb.is_empty() {
            return Err("xrdb cannot be empty".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if let Some(taxon) = &self.taxon_id {
            if taxon.is_empty() || !taxon.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!("taxon_id must be a numeric NCBI id, got '{}'", taxon));
            }
        }
        if self.taxon_constraints.is_some() && self.taxonomy_nodes.is_none() {
            return Err("taxon_constraints requires taxonomy_nodes".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Default)]
pub struct RefineryConfigBuilder {
    organism: Option<String>,
    taxon_id: Option<Option<String>>,
    go_obo_source: Option<String>,
    association_file: Option<String>,
    evidence_codes: Option<Vec<String>>,
    do_obo_source: Option<String>,
    xrdb: Option<String>,
    id_map_file: Option<PathBuf>,
    tag_mapping_file: Option<PathBuf>,
    taxonomy_nodes: Option<PathBuf>,
    taxonomy_names: Option<PathBuf>,
    taxon_constraints: Option<PathBuf>,
    download_folder: Option<PathBuf>,
    max_retries: Option<u32>,
    timeout_secs: Option<u64>,
    output: Option<PathBuf>,
}

impl RefineryConfigBuilder {
    pub fn organism(mut self, organism: impl Into<String>) -> Self {
        self.organism = Some(organism.into());
        self
    }

    pub fn taxon_id(mut self, taxon_id: impl Into<String>) -> Self {
        self.taxon_id = Some(Some(taxon_id.into()));
        self
    }

    /// Skip taxon restriction entirely
    pub fn no_taxon(mut self) -> Self {
        self.taxon_id = Some(None);
        self
    }

    pub fn go_obo_source(mut self, source: impl Into<String>) -> Self {
        self.go_obo_source = Some(source.into());
        self
    }

    pub fn association_file(mut self, source: impl Into<String>) -> Self {
        self.association_file = Some(source.into());
        self
    }

    pub fn evidence_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence_codes = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn do_obo_source(mut self, source: impl Into<String>) -> Self {
        self.do_obo_source = Some(source.into());
        self
    }

    pub fn xrdb(mut self, xrdb: impl Into<String>) -> Self {
        self.xrdb = Some(xrdb.into());
        self
    }

    pub fn id_map_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.id_map_file = Some(path.into());
        self
    }

    pub fn tag_mapping_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tag_mapping_file = Some(path.into());
        self
    }

    pub fn taxonomy_nodes(mut self, path: impl Into<PathBuf>) -> Self {
        self.taxonomy_nodes = Some(path.into());
        self
    }

    pub fn taxonomy_names(mut self, path: impl Into<PathBuf>) -> Self {
        self.taxonomy_names = Some(path.into());
        self
    }

    pub fn taxon_constraints(mut self, path: impl Into<PathBuf>) -> Self {
        self.taxon_constraints = Some(path.into());
        self
    }

    pub fn download_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.download_folder = Some(folder.into());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn build(self) -> RefineryConfig {
        let default = RefineryConfig::default();

        RefineryConfig {
            organism: self.organism.unwrap_or(default.organism),
            taxon_id: self.taxon_id.unwrap_or(default.taxon_id),
            go_obo_source: self.go_obo_source.unwrap_or(default.go_obo_source),
            association_file: self.association_file,
            evidence_codes: self.evidence_codes.unwrap_or(default.evidence_codes),
            do_obo_source: self.do_obo_source.unwrap_or(default.do_obo_source),
            xrdb: self.xrdb.unwrap_or(default.xrdb),
            id_map_file: self.id_map_file,
            tag_mapping_file: self.tag_mapping_file,
            taxonomy_nodes: self.taxonomy_nodes,
            taxonomy_names: self.taxonomy_names,
            taxon_constraints: self.taxon_constraints,
            download_folder: self.download_folder.unwrap_or(default.download_folder),
            max_retries: self.max_retries.unwrap_or(default.max_retries),
            timeout_secs: self.timeout_secs.unwrap_or(default.timeout_secs),
            output: self.output,
        }
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

impl RefineryConfig {
    /// Human with the GO Consortium association file
    pub fn human() -> Self {
        RefineryConfig::builder()
            .association_file("http://current.geneontology.org/annotations/goa_human.gaf.gz")
            .build()
    }

    /// Mouse with MGI identifiers
    pub fn mouse() -> Self {
        RefineryConfig::builder()
            .organism("Mus musculus")
            .taxon_id("10090")
            .association_file("http://current.geneontology.org/annotations/mgi.gaf.gz")
            .xrdb("MGI")
            .build()
    }

    /// Any organism, identified by scientific name and NCBI taxon id
    pub fn organism_config(organism: &str, taxon_id: &str, association_file: &str) -> Self {
        RefineryConfig::builder()
            .organism(organism)
            .taxon_id(taxon_id)
            .association_file(association_file)
            .build()
    }
}

// ============================================================================
// Environment Variable Support
// ============================================================================

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|value| value.trim().parse().ok())
}

impl RefineryConfig {
    /// Load `.env` if present, then read `REFINERY_*` variables over the defaults
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env_vars()
    }

    /// Read `REFINERY_*` variables over the defaults without touching `.env`
    pub fn from_env_vars() -> Self {
        let default = RefineryConfig::default();

        RefineryConfig {
            organism: env_string("REFINERY_ORGANISM").unwrap_or(default.organism),
            taxon_id: env_string("REFINERY_TAXON_ID").or(default.taxon_id),
            go_obo_source: env_string("REFINERY_GO_OBO").unwrap_or(default.go_obo_source),
            association_file: env_string("REFINERY_ASSOCIATION_FILE"),
            evidence_codes: env_string("REFINERY_EVIDENCE_CODES")
                .map(|codes| parse_code_list(&codes))
                .unwrap_or(default.evidence_codes),
            do_obo_source: env_string("REFINERY_DO_OBO").unwrap_or(default.do_obo_source),
            xrdb: env_string("REFINERY_XRDB").unwrap_or(default.xrdb),
            id_map_file: env_string("REFINERY_ID_MAP_FILE").map(PathBuf::from),
            tag_mapping_file: env_string("REFINERY_TAG_MAPPING_FILE").map(PathBuf::from),
            taxonomy_nodes: env_string("REFINERY_TAXONOMY_NODES").map(PathBuf::from),
            taxonomy_names: env_string("REFINERY_TAXONOMY_NAMES").map(PathBuf::from),
            taxon_constraints: env_string("REFINERY_TAXON_CONSTRAINTS").map(PathBuf::from),
            download_folder: env_string("REFINERY_DOWNLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(default.download_folder),
            max_retries: env_parse("REFINERY_MAX_RETRIES").unwrap_or(default.max_retries),
            timeout_secs: env_parse("REFINERY_TIMEOUT_SECS").unwrap_or(default.timeout_secs),
            output: env_string("REFINERY_OUTPUT").map(PathBuf::from),
        }
    }
}

/// Split a comma or whitespace separated evidence code list
pub fn parse_code_list(codes: &str) -> Vec<String> {
    codes
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_uppercase)
        .collect()
}
