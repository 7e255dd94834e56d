// Source file downloader (HTTP)

use std::future::Future;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use futures::StreamExt;
use refinery_ontology::{Ontology, OntologyError};
use reqwest::Client;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::RefineryConfig;
use crate::error::{IngestError, Result};

/// Delay before the first retry; doubled on every further attempt
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// HTTP client for ontology and association files
pub struct Downloader {
    client: Client,
    max_retries: u32,
    backoff: Duration,
}

impl Downloader {
    /// Create new downloader with configuration
    pub fn new(config: &RefineryConfig) -> Result<Self> {
        config.validate().map_err(IngestError::Validation)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("geneset-refinery/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Downloader {
            client,
            max_retries: config.max_retries,
            backoff: DEFAULT_BACKOFF,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Fetch `url` into memory, decompressing `.gz` payloads
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading {}", url);
        let content = self.download_with_retry(url).await?;
        info!("Downloaded {} bytes ({} KB) from {}", content.len(), content.len() / 1024, url);

        if is_gzip_name(url) {
            let decompressed = decompress_gzip(&content)?;
            info!("Decompressed to {} bytes ({} KB)", decompressed.len(), decompressed.len() / 1024);
            return Ok(decompressed);
        }
        Ok(content)
    }

    /// Read a source that is either a URL or a local path.
    ///
    /// A missing local file is [`OntologyError::SourceUnavailable`].
    pub async fn read_source(&self, source: &str) -> Result<Vec<u8>> {
        if RefineryConfig::is_remote(source) {
            return self.fetch(source).await;
        }

        let content = tokio::fs::read(source).await.map_err(|e| {
            warn!("Could not read {} on the local filesystem", source);
            OntologyError::SourceUnavailable {
                location: source.to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!("Read {} bytes from {}", content.len(), source);

        if is_gzip_name(source) {
            return decompress_gzip(&content);
        }
        Ok(content)
    }

    /// Parse an ontology from a URL or a local path
    pub async fn load_ontology(&self, source: &str) -> Result<Ontology> {
        if RefineryConfig::is_remote(source) {
            let content = self.fetch(source).await?;
            return Ok(Ontology::parse(content.as_slice())?);
        }
        Ok(Ontology::load_obo_file(source)?)
    }

    /// Stream `url` into `folder`, named `file_name` or the URL's last path
    /// segment.
    ///
    /// The body goes to a temporary file in the same folder and is renamed
    /// only once complete, so an interrupted run never leaves a truncated
    /// target behind. Returns `false` without downloading when the target
    /// already exists.
    pub async fn download_to_folder(
        &self,
        url: &str,
        folder: &Path,
        file_name: Option<&str>,
    ) -> Result<bool> {
        let name = file_name.unwrap_or_else(|| RefineryConfig::file_name_for(url));
        let target = folder.join(name);

        if target.exists() {
            warn!("Not downloading {}, it already exists in {}", name, folder.display());
            return Ok(false);
        }
        tokio::fs::create_dir_all(folder).await?;

        let temp = self
            .retry(url, || self.stream_to_temp(url, folder, name))
            .await?;
        temp.persist(&target)?;

        info!("Saved {} to {}", url, target.display());
        Ok(true)
    }

    /// Fetch every remote source in `config` into its download folder
    pub async fn download_sources(&self, config: &RefineryConfig) -> Result<Vec<PathBuf>> {
        let sources = [
            Some(config.go_obo_source.as_str()),
            config.association_file.as_deref(),
            Some(config.do_obo_source.as_str()),
        ];

        let mut saved = Vec::new();
        for source in sources.into_iter().flatten() {
            if !RefineryConfig::is_remote(source) {
                continue;
            }
            if self.download_to_folder(source, &config.download_folder, None).await? {
                saved.push(config.local_path_for(source));
            }
        }
        Ok(saved)
    }

    /// Download URL with retry logic
    pub async fn download_with_retry(&self, url: &str) -> Result<Vec<u8>> {
        self.retry(url, || self.download_url(url)).await
    }

    async fn retry<T, F, Fut>(&self, url: &str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Download attempt {}/{} for {} failed: {}", attempt, self.max_retries, url, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt - 1));
                        info!("Retrying in {:?}...", delay);
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts were made".to_string());
        Err(OntologyError::SourceUnavailable {
            location: url.to_string(),
            reason: format!("gave up after {} attempts: {}", self.max_retries, reason),
        }
        .into())
    }

    /// Download URL without retry
    async fn download_url(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn stream_to_temp(&self, url: &str, folder: &Path, name: &str) -> Result<NamedTempFile> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let mut temp = tempfile::Builder::new()
            .prefix(&format!("{}.", name))
            .tempfile_in(folder)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            temp.write_all(&chunk?)?;
        }
        temp.flush()?;
        Ok(temp)
    }
}

fn is_gzip_name(source: &str) -> bool {
    RefineryConfig::file_name_for(source).ends_with(".gz")
}

/// Decompress gzip bytes
pub fn decompress_gzip(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| IngestError::Decompression(e.to_string()))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OBO: &str = "[Term]\nid: GO:0000001\nname: root\n\n[Term]\nid: GO:0000002\nname: leaf\nis_a: GO:0000001\n";

    fn downloader(retries: u32) -> Downloader {
        let config = RefineryConfig::builder().max_retries(retries).build();
        Downloader::new(&config)
            .unwrap()
            .with_backoff(Duration::from_millis(1))
    }

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RefineryConfig::builder().max_retries(0).build();
        assert!(matches!(Downloader::new(&config), Err(IngestError::Validation(_))));
    }

    #[test]
    fn test_decompress_gzip() {
        assert_eq!(decompress_gzip(&gzip("abc")).unwrap(), b"abc");
        assert!(matches!(
            decompress_gzip(b"not gzip"),
            Err(IngestError::Decompression(_))
        ));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/go-basic.obo"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/go-basic.obo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OBO))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/go-basic.obo", server.uri());
        let body = downloader(3).download_with_retry(&url).await.unwrap();
        assert_eq!(body, OBO.as_bytes());
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_source_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let url = format!("{}/missing.obo", server.uri());
        let err = downloader(3).fetch(&url).await.unwrap_err();
        match err {
            IngestError::Ontology(OntologyError::SourceUnavailable { location, .. }) => {
                assert_eq!(location, url);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_decompresses_gz() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/go-basic.obo.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(OBO)))
            .mount(&server)
            .await;

        let url = format!("{}/go-basic.obo.gz", server.uri());
        let ontology = downloader(1).load_ontology(&url).await.unwrap();
        assert_eq!(ontology.len(), 2);
    }

    #[tokio::test]
    async fn test_download_to_folder_skips_existing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/obo/doid.obo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OBO))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/obo/doid.obo", server.uri());
        let downloader = downloader(1);

        assert!(downloader.download_to_folder(&url, dir.path(), None).await.unwrap());
        assert!(!downloader.download_to_folder(&url, dir.path(), None).await.unwrap());

        let saved = std::fs::read_to_string(dir.path().join("doid.obo")).unwrap();
        assert_eq!(saved, OBO);
        // the temporary file was renamed, not copied
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/mgi.gaf.gz", server.uri());
        let result = downloader(2)
            .download_to_folder(&url, dir.path(), Some("mgi.gaf.gz"))
            .await;

        assert!(result.is_err());
        assert!(!dir.path().join("mgi.gaf.gz").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_read_source_local_paths() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("assoc.gaf");
        let packed = dir.path().join("assoc.gaf.gz");
        std::fs::write(&plain, "line\n").unwrap();
        std::fs::write(&packed, gzip("line\n")).unwrap();

        let downloader = downloader(1);
        assert_eq!(downloader.read_source(plain.to_str().unwrap()).await.unwrap(), b"line\n");
        assert_eq!(downloader.read_source(packed.to_str().unwrap()).await.unwrap(), b"line\n");

        let missing = dir.path().join("absent.gaf");
        let err = downloader.read_source(missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, IngestError::Ontology(OntologyError::SourceUnavailable { .. })));
    }
}
