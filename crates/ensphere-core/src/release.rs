//! Installer self-version check
//!
//! The published releases of the installer are read from its packagist
//! listing. A newer release only produces a warning; any failure to fetch
//! or parse the listing skips the check.

use crate::error::{InstallerError, Result};
use crate::product::ProductConfig;
use indexmap::IndexMap;
use semver::Version;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

#[derive(Debug, Deserialize)]
struct ReleaseListing {
    #[serde(default)]
    packages: IndexMap<String, IndexMap<String, Value>>,
}

/// Compare the running version against the latest release.
/// Returns a warning message if the running installer is older.
pub fn check_compatibility(
    current_version: &str,
    latest_version: &str,
    upgrade_command: &str,
) -> Option<String> {
    let current = parse_version(current_version).ok()?;
    let latest = parse_version(latest_version).ok()?;

    if current < latest {
        Some(format!(
            "You are running version {} of the installer, but {} is available.\n\
             Update with: {}",
            current_version, latest_version, upgrade_command
        ))
    } else {
        None
    }
}

/// Parse a version string, ignoring a leading `v`
pub fn parse_version(version_str: &str) -> std::result::Result<Version, semver::Error> {
    let cleaned = version_str.trim();
    let cleaned = cleaned.strip_prefix('v').unwrap_or(cleaned);
    Version::parse(cleaned)
}

/// Highest semver release among the listed version keys
pub fn latest_release<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<Version> {
    versions
        .into_iter()
        .filter_map(|key| parse_version(key).ok())
        .max()
}

/// Fetches the installer's release listing
pub struct ReleaseChecker {
    url: Url,
    package: String,
    upgrade_command: String,
    client: reqwest::Client,
}

impl ReleaseChecker {
    pub fn new(url: Url, package: &str, upgrade_command: &str, user_agent: &str) -> Self {
        Self {
            url,
            package: package.to_string(),
            upgrade_command: upgrade_command.to_string(),
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Create a checker from a product config
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let url_str = config.endpoint(config.releases_url_env(), config.default_releases_url());
        let url = Url::parse(&url_str).map_err(|e| InstallerError::FetchFailed {
            url: url_str.clone(),
            reason: format!("invalid URL: {}", e),
        })?;
        Ok(Self::new(
            url,
            config.installer_package(),
            config.upgrade_command(),
            config.user_agent(),
        ))
    }

    /// Latest published release of the installer
    pub async fn fetch_latest(&self) -> Result<Option<Version>> {
        let fetch_failed = |reason: String| InstallerError::FetchFailed {
            url: self.url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_failed(format!("HTTP {}", response.status())));
        }

        let listing: ReleaseListing = response
            .json()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        Ok(listing
            .packages
            .get(&self.package)
            .and_then(|versions| latest_release(versions.keys().map(String::as_str))))
    }

    /// Warning to show when a newer installer exists; `None` when up to date or unknown
    pub async fn check(&self, current_version: &str) -> Option<String> {
        match self.fetch_latest().await {
            Ok(Some(latest)) => {
                check_compatibility(current_version, &latest.to_string(), &self.upgrade_command)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "skipping installer version check");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const UPGRADE: &str = "composer global require ensphere/installer";

    #[test]
    fn test_installer_older_than_release() {
        let warning = check_compatibility("1.1.0", "1.2.0", UPGRADE);
        assert!(warning.is_some());
        assert!(warning.unwrap().contains("1.2.0"));
    }

    #[test]
    fn test_installer_up_to_date() {
        assert!(check_compatibility("1.1.0", "1.1.0", UPGRADE).is_none());
        assert!(check_compatibility("1.2.0", "1.1.0", UPGRADE).is_none());
    }

    #[test]
    fn test_invalid_versions() {
        assert!(check_compatibility("invalid", "1.1.0", UPGRADE).is_none());
    }

    #[test]
    fn test_latest_release_skips_branches() {
        let latest = latest_release(["v1.0.9", "dev-master", "v1.1.0", "1.0.10"]).unwrap();
        assert_eq!(latest, Version::new(1, 1, 0));
        assert!(latest_release(["dev-master"]).is_none());
    }

    #[tokio::test]
    async fn test_check_against_listing() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/p/ensphere/installer.json");
                then.status(200).json_body(serde_json::json!({
                    "packages": {
                        "ensphere/installer": {
                            "dev-master": {},
                            "v1.1.0": {},
                            "v1.3.2": {}
                        }
                    }
                }));
            })
            .await;

        let url = Url::parse(&server.url("/p/ensphere/installer.json")).unwrap();
        let checker = ReleaseChecker::new(url, "ensphere/installer", UPGRADE, "ensphere");
        let warning = checker.check("1.1.0").await.unwrap();

        mock.assert_async().await;
        assert!(warning.contains("1.3.2"));
        assert!(warning.contains(UPGRADE));
    }

    #[tokio::test]
    async fn test_unreachable_listing_is_skipped() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/p/ensphere/installer.json");
                then.status(500);
            })
            .await;

        let url = Url::parse(&server.url("/p/ensphere/installer.json")).unwrap();
        let checker = ReleaseChecker::new(url, "ensphere/installer", UPGRADE, "ensphere");
        assert!(checker.check("1.1.0").await.is_none());
    }
}
