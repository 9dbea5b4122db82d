//! Application template fetching
//!
//! The template is a zip archive with a single top-level directory (the
//! layout GitHub produces for branch downloads). It is written to a
//! temporary `ensphere_<unique>.zip` next to where it is extracted, and that
//! file is removed whether or not extraction succeeds.

use crate::error::{InstallerError, Result};
use crate::product::ProductConfig;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;
use zip::ZipArchive;

/// Archive source - either a remote URL or a local zip file
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    Remote(Url),
    Local(PathBuf),
}

impl ArchiveSource {
    /// Create a remote archive source from a product config
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let url_str = config.endpoint(config.archive_url_env(), config.default_archive_url());
        let url = Url::parse(&url_str).map_err(|e| InstallerError::FetchFailed {
            url: url_str.clone(),
            reason: format!("invalid URL: {}", e),
        })?;
        Ok(Self::Remote(url))
    }

    /// Create a local archive source from a zip path
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    fn describe(&self) -> String {
        match self {
            Self::Remote(url) => url.to_string(),
            Self::Local(path) => path.display().to_string(),
        }
    }
}

/// Downloads and unpacks the application template
pub struct ArchiveFetcher {
    source: ArchiveSource,
    client: reqwest::Client,
    prefix: String,
}

impl ArchiveFetcher {
    /// Create a new fetcher with a custom user agent
    pub fn new(source: ArchiveSource, user_agent: &str) -> Self {
        Self {
            source,
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            prefix: user_agent.to_string(),
        }
    }

    /// Create a fetcher from a product config
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let source = ArchiveSource::from_config(config)?;
        let mut fetcher = Self::new(source, config.user_agent());
        fetcher.prefix = config.name().to_string();
        Ok(fetcher)
    }

    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    /// Fetch the archive into `destination` and return the extracted template root
    pub async fn fetch(&self, destination: &Path) -> Result<PathBuf> {
        let bytes = self.download().await?;

        let archive_path = destination.join(self.temp_name());
        std::fs::write(&archive_path, &bytes)?;
        tracing::debug!(archive = %archive_path.display(), size = bytes.len(), "template archive saved");

        let extracted = extract_single_root(&archive_path, destination);

        if let Err(e) = std::fs::remove_file(&archive_path) {
            tracing::warn!(
                archive = %archive_path.display(),
                error = %e,
                "could not remove temporary archive"
            );
        }

        let root = extracted?;
        tracing::info!(root = %root.display(), "template extracted");
        Ok(root)
    }

    async fn download(&self) -> Result<Vec<u8>> {
        let fetch_failed = |reason: String| InstallerError::FetchFailed {
            url: self.source.describe(),
            reason,
        };

        match &self.source {
            ArchiveSource::Remote(url) => {
                tracing::info!(%url, "downloading template archive");
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| fetch_failed(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(fetch_failed(format!("HTTP {}", response.status())));
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| fetch_failed(e.to_string()))?;
                Ok(bytes.to_vec())
            }
            ArchiveSource::Local(path) => {
                tracing::info!(path = %path.display(), "reading local template archive");
                std::fs::read(path).map_err(|e| fetch_failed(e.to_string()))
            }
        }
    }

    fn temp_name(&self) -> String {
        let unique: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        format!("{}_{}.zip", self.prefix, unique)
    }
}

/// Extract `archive` into `destination`, requiring exactly one top-level directory
fn extract_single_root(archive: &Path, destination: &Path) -> Result<PathBuf> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| InstallerError::extract(format!("{}: {}", archive.display(), e)))?;

    let root = single_root(zip.file_names())?;

    zip.extract(destination)
        .map_err(|e| InstallerError::extract(e.to_string()))?;

    let root_dir = destination.join(&root);
    if !root_dir.is_dir() {
        return Err(InstallerError::extract(format!(
            "'{}' was not extracted as a directory",
            root
        )));
    }
    Ok(root_dir)
}

/// Name of the single directory every entry lives under
fn single_root<'a>(names: impl Iterator<Item = &'a str>) -> Result<String> {
    let mut roots = BTreeSet::new();
    for name in names {
        match name.split_once('/') {
            Some((root, _)) if !root.is_empty() => {
                roots.insert(root.to_string());
            }
            _ => {
                return Err(InstallerError::extract(format!(
                    "entry '{}' is outside a top-level directory",
                    name
                )))
            }
        }
    }

    let mut roots = roots.into_iter();
    match (roots.next(), roots.next()) {
        (Some(root), None) => Ok(root),
        (None, _) => Err(InstallerError::extract("archive is empty")),
        (Some(_), Some(_)) => Err(InstallerError::extract(
            "archive has more than one top-level directory",
        )),
    }
}
