//! Dataset sources, credentials, and the fetch seam.
//!
//! The [`Fetch`] trait abstracts the network boundary so extraction logic can
//! be exercised against in-memory payloads in tests. The production
//! implementation is a blocking `reqwest` client.

use crate::error::PipelineError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Where a dataset comes from. Immutable once configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// Plain HTTP(S) GET of a delimited text file.
    DirectUrl { url: String },
    /// Zip archive downloaded from the dataset-hosting service.
    /// `slug` is `owner/dataset`; `file` is the CSV entry expected inside.
    HostedDataset { slug: String, file: String },
}

impl DatasetSource {
    pub fn direct(url: impl Into<String>) -> Self {
        DatasetSource::DirectUrl { url: url.into() }
    }

    pub fn hosted(slug: impl Into<String>, file: impl Into<String>) -> Self {
        DatasetSource::HostedDataset {
            slug: slug.into(),
            file: file.into(),
        }
    }

    /// The URL the fetch layer should request for this source.
    pub fn request_url(&self, api_base: &str) -> String {
        match self {
            DatasetSource::DirectUrl { url } => url.clone(),
            DatasetSource::HostedDataset { slug, .. } => {
                format!("{}/datasets/download/{slug}", api_base.trim_end_matches('/'))
            }
        }
    }
}

/// API token for the dataset-hosting service.
///
/// Loaded from `{config_dir}/credentials.json` — the same shape the service
/// hands out for download ({"username": ..., "key": ...}). Passed into the
/// extractor explicitly; nothing reads it from ambient process state.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub key: String,
}

impl Credentials {
    pub const FILE_NAME: &'static str = "credentials.json";

    pub fn from_config_dir(config_dir: &Path) -> Result<Self, PipelineError> {
        let path = config_dir.join(Self::FILE_NAME);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            PipelineError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Credentials(format!("malformed {}: {e}", path.display()))
        })
    }
}

/// Outcome of a single GET, before any interpretation of the bytes.
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl FetchedPayload {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network boundary. Implementations perform exactly one blocking GET;
/// the extractor decides what the returned bytes mean.
pub trait Fetch {
    fn fetch(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<FetchedPayload, PipelineError>;
}

/// Blocking HTTP fetcher used in production runs.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("climatepipe/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<FetchedPayload, PipelineError> {
        let mut request = self.client.get(url);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.key));
        }

        let response = request
            .send()
            .map_err(|e| PipelineError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .map_err(|e| PipelineError::Network(e.to_string()))?
            .to_vec();

        Ok(FetchedPayload { status, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_for_each_kind() {
        let direct = DatasetSource::direct("https://example.net/data.csv");
        assert_eq!(
            direct.request_url("https://api.example.net/v1"),
            "https://example.net/data.csv"
        );

        let hosted = DatasetSource::hosted("acme/co2-by-country", "co2.csv");
        assert_eq!(
            hosted.request_url("https://api.example.net/v1/"),
            "https://api.example.net/v1/datasets/download/acme/co2-by-country"
        );
    }

    #[test]
    fn credentials_load_and_reject_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(Credentials::FILE_NAME);

        std::fs::write(&path, r#"{"username":"etl","key":"s3cret"}"#).unwrap();
        let creds = Credentials::from_config_dir(dir.path()).unwrap();
        assert_eq!(creds.username, "etl");
        assert_eq!(creds.key, "s3cret");

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Credentials::from_config_dir(dir.path()),
            Err(PipelineError::Credentials(_))
        ));
    }
}
