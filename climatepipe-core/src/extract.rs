//! Extraction: fetch one source into the staging area and parse it into a
//! raw table.
//!
//! Direct URLs are fetched as-is; hosted datasets come down as a zip archive
//! whose entries are unpacked into staging before the expected CSV is
//! located (by name first, first `.csv` entry as the positional fallback).
//! Every byte written to disk is registered with the staging area so a
//! successful run can delete it afterwards.

use crate::decode;
use crate::error::PipelineError;
use crate::source::{Credentials, DatasetSource, Fetch};
use crate::staging::StagingArea;
use crate::table::Table;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Default API base of the dataset-hosting service.
pub const DEFAULT_API_BASE: &str = "https://www.kaggle.com/api/v1";

/// Result of extracting one source.
#[derive(Debug)]
pub struct Extraction {
    /// The raw table, exactly as parsed — no cleaning applied.
    pub table: Table,
    /// Staging files this extraction wrote, in write order.
    pub artifacts: Vec<PathBuf>,
    /// BLAKE3 hex digest of the fetched payload, for provenance reporting.
    pub content_hash: String,
}

/// Retrieves one raw tabular file per source.
pub struct Extractor<'a> {
    fetcher: &'a dyn Fetch,
    credentials: Option<Credentials>,
    api_base: String,
}

impl<'a> Extractor<'a> {
    pub fn new(fetcher: &'a dyn Fetch, credentials: Option<Credentials>) -> Self {
        Self {
            fetcher,
            credentials,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Override the hosting-service API base (tests point this at fixtures).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Extract one source into the staging area.
    pub fn extract(
        &self,
        name: &str,
        source: &DatasetSource,
        staging: &mut StagingArea,
    ) -> Result<Extraction, PipelineError> {
        match source {
            DatasetSource::DirectUrl { url } => self.extract_direct(name, url, staging),
            DatasetSource::HostedDataset { slug, file } => {
                self.extract_hosted(name, slug, file, staging)
            }
        }
    }

    fn fetch_checked(
        &self,
        name: &str,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<u8>, PipelineError> {
        let payload = self.fetcher.fetch(url, credentials)?;
        if !payload.is_success() {
            return Err(PipelineError::Fetch {
                dataset: name.to_string(),
                status: payload.status,
            });
        }
        Ok(payload.bytes)
    }

    fn extract_direct(
        &self,
        name: &str,
        url: &str,
        staging: &mut StagingArea,
    ) -> Result<Extraction, PipelineError> {
        let bytes = self.fetch_checked(name, url, None)?;
        let content_hash = blake3::hash(&bytes).to_hex().to_string();

        let csv_path = staging.path_for(&format!("{name}.csv"));
        fs::write(&csv_path, &bytes)?;

        let text = decode::decode_text(&bytes, name)?;
        let table = decode::parse_csv(&text, name)?;
        ensure_non_empty(name, &table)?;

        Ok(Extraction {
            table,
            artifacts: vec![csv_path],
            content_hash,
        })
    }

    fn extract_hosted(
        &self,
        name: &str,
        slug: &str,
        file: &str,
        staging: &mut StagingArea,
    ) -> Result<Extraction, PipelineError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            PipelineError::Credentials(format!(
                "hosted dataset '{slug}' requires a credentials file"
            ))
        })?;

        let url = DatasetSource::hosted(slug, file).request_url(&self.api_base);
        let bytes = self.fetch_checked(name, &url, Some(credentials))?;
        let content_hash = blake3::hash(&bytes).to_hex().to_string();

        let zip_path = staging.path_for(&format!("{}.zip", slug.replace('/', "_")));
        fs::write(&zip_path, &bytes)?;
        let mut artifacts = vec![zip_path.clone()];

        // Unpack every file entry flat into staging; archives from the
        // hosting service are a handful of CSVs at most.
        let zip_file = fs::File::open(&zip_path)?;
        let mut archive = zip::ZipArchive::new(zip_file).map_err(|e| PipelineError::Archive {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        let mut expected: Option<PathBuf> = None;
        let mut first_csv: Option<PathBuf> = None;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| PipelineError::Archive {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            if !entry.is_file() {
                continue;
            }
            let entry_name = match entry.enclosed_name().and_then(|p| {
                p.file_name().map(|f| f.to_string_lossy().into_owned())
            }) {
                Some(n) => n,
                None => continue,
            };

            let out_path = staging.path_for(&entry_name);
            let mut out = fs::File::create(&out_path)?;
            io::copy(&mut entry, &mut out)?;
            artifacts.push(out_path.clone());

            if entry_name == file {
                expected = Some(out_path);
            } else if entry_name.ends_with(".csv") && first_csv.is_none() {
                first_csv = Some(out_path);
            }
        }

        let csv_path = expected
            .or(first_csv)
            .ok_or_else(|| PipelineError::Archive {
                name: name.to_string(),
                reason: format!("archive contains no '{file}' and no other .csv entry"),
            })?;

        let csv_bytes = fs::read(&csv_path)?;
        let text = decode::decode_text(&csv_bytes, name)?;
        let table = decode::parse_csv(&text, name)?;
        ensure_non_empty(name, &table)?;

        Ok(Extraction {
            table,
            artifacts,
            content_hash,
        })
    }
}

fn ensure_non_empty(name: &str, table: &Table) -> Result<(), PipelineError> {
    if table.is_empty() {
        return Err(PipelineError::Schema {
            dataset: name.to_string(),
            reason: "no data rows after extraction".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FetchedPayload;
    use crate::table::Value;
    use std::collections::HashMap;
    use std::io::Write;

    /// In-memory fetcher: maps URLs to canned payloads.
    struct FakeFetcher {
        responses: HashMap<String, FetchedPayload>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
            }
        }

        fn with(mut self, url: &str, status: u16, bytes: &[u8]) -> Self {
            self.responses.insert(
                url.to_string(),
                FetchedPayload {
                    status,
                    bytes: bytes.to_vec(),
                },
            );
            self
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch(
            &self,
            url: &str,
            _credentials: Option<&Credentials>,
        ) -> Result<FetchedPayload, PipelineError> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| PipelineError::Network(format!("no route to {url}")))
        }
    }

    fn test_credentials() -> Credentials {
        Credentials {
            username: "etl".into(),
            key: "k".into(),
        }
    }

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for (name, content) in entries {
                let options: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default()
                    .compression_method(zip::CompressionMethod::Stored);
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn direct_url_extraction_stages_and_parses() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::new(dir.path().join("staging")).unwrap();

        let fetcher = FakeFetcher::new().with(
            "https://example.net/temps.csv",
            200,
            b"Country,Year,Temperature\nDenmark,2001,7.5\n",
        );
        let extractor = Extractor::new(&fetcher, None);

        let extraction = extractor
            .extract(
                "temperature",
                &DatasetSource::direct("https://example.net/temps.csv"),
                &mut staging,
            )
            .unwrap();

        assert_eq!(extraction.table.row_count(), 1);
        assert_eq!(extraction.table.rows()[0][1], Value::Int(2001));
        assert_eq!(extraction.artifacts.len(), 1);
        assert!(extraction.artifacts[0].exists());
        assert_eq!(extraction.content_hash.len(), 64);
    }

    #[test]
    fn non_success_status_is_a_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::new(dir.path().join("staging")).unwrap();

        let fetcher = FakeFetcher::new().with("https://example.net/gone.csv", 404, b"");
        let extractor = Extractor::new(&fetcher, None);

        let err = extractor
            .extract(
                "gone",
                &DatasetSource::direct("https://example.net/gone.csv"),
                &mut staging,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Fetch { status: 404, .. }
        ));
        // Nothing was staged for the failed fetch.
        assert!(staging.artifacts().is_empty());
    }

    #[test]
    fn hosted_dataset_unpacks_archive_and_finds_expected_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::new(dir.path().join("staging")).unwrap();

        let archive = zip_with(&[
            ("readme.txt", "about this dataset"),
            ("co2.csv", "country,year,value\nDNK,2001,44000\n"),
        ]);
        let fetcher = FakeFetcher::new().with(
            "https://api.test/v1/datasets/download/acme/co2",
            200,
            &archive,
        );
        let extractor =
            Extractor::new(&fetcher, Some(test_credentials())).with_api_base("https://api.test/v1");

        let extraction = extractor
            .extract(
                "co2",
                &DatasetSource::hosted("acme/co2", "co2.csv"),
                &mut staging,
            )
            .unwrap();

        assert_eq!(extraction.table.columns(), ["country", "year", "value"]);
        assert_eq!(extraction.table.row_count(), 1);
        // Zip plus both unpacked entries were staged.
        assert_eq!(extraction.artifacts.len(), 3);
        for artifact in &extraction.artifacts {
            assert!(artifact.exists());
        }
    }

    #[test]
    fn hosted_dataset_falls_back_to_first_csv_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::new(dir.path().join("staging")).unwrap();

        let archive = zip_with(&[("renamed_export.csv", "country,value\nDNK,1\n")]);
        let fetcher = FakeFetcher::new().with(
            "https://api.test/v1/datasets/download/acme/co2",
            200,
            &archive,
        );
        let extractor =
            Extractor::new(&fetcher, Some(test_credentials())).with_api_base("https://api.test/v1");

        let extraction = extractor
            .extract(
                "co2",
                &DatasetSource::hosted("acme/co2", "co2.csv"),
                &mut staging,
            )
            .unwrap();

        assert_eq!(extraction.table.columns(), ["country", "value"]);
    }

    #[test]
    fn hosted_dataset_without_credentials_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::new(dir.path().join("staging")).unwrap();

        let fetcher = FakeFetcher::new();
        let extractor = Extractor::new(&fetcher, None);

        let err = extractor
            .extract(
                "co2",
                &DatasetSource::hosted("acme/co2", "co2.csv"),
                &mut staging,
            )
            .unwrap_err();

        assert!(matches!(err, PipelineError::Credentials(_)));
    }

    #[test]
    fn empty_payload_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::new(dir.path().join("staging")).unwrap();

        let fetcher =
            FakeFetcher::new().with("https://example.net/empty.csv", 200, b"Country,Year\n");
        let extractor = Extractor::new(&fetcher, None);

        let err = extractor
            .extract(
                "empty",
                &DatasetSource::direct("https://example.net/empty.csv"),
                &mut staging,
            )
            .unwrap_err();

        assert!(matches!(err, PipelineError::Schema { .. }));
    }
}
