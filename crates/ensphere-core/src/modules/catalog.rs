//! Module catalog fetching
//!
//! The catalog is a composer repository: `packages.json` points at a package
//! list through its `includes` map, and that list holds every published
//! version of every module.

use crate::error::{InstallerError, Result};
use crate::product::ProductConfig;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// One published version of a module
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionRecord {
    pub name: String,
    pub version: String,
}

/// Every module with its versions in publication order
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: IndexMap<String, Vec<VersionRecord>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: impl Into<String>, versions: Vec<VersionRecord>) {
        self.modules.insert(module.into(), versions);
    }

    pub fn versions(&self, module: &str) -> Option<&[VersionRecord]> {
        self.modules.get(module).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[VersionRecord])> {
        self.modules
            .iter()
            .map(|(name, versions)| (name.as_str(), versions.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// `packages.json`
#[derive(Debug, Deserialize)]
struct PackagesIndex {
    #[serde(default)]
    includes: IndexMap<String, Value>,
}

/// The package list referenced by `packages.json`
#[derive(Debug, Deserialize)]
struct PackageList {
    #[serde(default)]
    packages: IndexMap<String, Value>,
}

/// HTTP client for the module catalog
pub struct CatalogClient {
    base_url: Url,
    client: reqwest::Client,
}

impl CatalogClient {
    /// Create a new client with a custom user agent
    pub fn new(base_url: Url, user_agent: &str) -> Self {
        Self {
            base_url: as_directory(base_url),
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Create a client from a product config
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let url_str = config.endpoint(config.modules_url_env(), config.default_modules_url());
        let url = Url::parse(&url_str)
            .map_err(|e| InstallerError::catalog(format!("Invalid catalog URL {}: {}", url_str, e)))?;
        Ok(Self::new(url, config.user_agent()))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch `packages.json` and the package list it points at
    pub async fn fetch_catalog(&self) -> Result<ModuleCatalog> {
        let index: PackagesIndex = self.get_json("packages.json").await?;
        let include = index
            .includes
            .keys()
            .next()
            .ok_or_else(|| InstallerError::catalog("packages.json lists no includes"))?
            .clone();

        tracing::debug!(%include, "following catalog include");
        let list: PackageList = self.get_json(&include).await?;

        let mut catalog = ModuleCatalog::new();
        for (module, versions) in list.packages {
            catalog.insert(module, parse_versions(versions));
        }

        tracing::info!(modules = catalog.len(), "module catalog loaded");
        Ok(catalog)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| InstallerError::catalog(format!("Invalid catalog path {}: {}", path, e)))?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| InstallerError::catalog(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(InstallerError::catalog(format!(
                "Failed to fetch {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| InstallerError::catalog(format!("Failed to read {}: {}", url, e)))?;
        serde_json::from_str(&body)
            .map_err(|e| InstallerError::catalog(format!("Failed to parse {}: {}", url, e)))
    }
}

/// Version maps are objects keyed by version, but an empty one is encoded as `[]`
fn parse_versions(value: Value) -> Vec<VersionRecord> {
    let entries: Vec<Value> = match value {
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<VersionRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed version record");
                None
            }
        })
        .collect()
}

/// Ensure relative joins land under the base path rather than replacing its last segment
fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
