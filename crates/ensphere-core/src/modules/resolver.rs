//! Latest-numeric-release selection
//!
//! A version is only eligible when it is made of digits once the dots are
//! removed (`2.1.3` -> `213`). Eligible versions are ordered by that numeric
//! form and the highest one wins. Pre-release and branch tags
//! (`2.1.0-beta`, `dev-master`) never qualify.

use super::catalog::{ModuleCatalog, VersionRecord};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Selected version per module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedModuleSet {
    versions: BTreeMap<String, String>,
}

impl ResolvedModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: impl Into<String>, version: impl Into<String>) {
        self.versions.insert(module.into(), version.into());
    }

    /// Resolved version of a module, if it had any eligible release
    pub fn get(&self, module: &str) -> Option<&str> {
        self.versions.get(module).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.versions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResolvedModuleSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (module, version) in iter {
            set.insert(module, version);
        }
        set
    }
}

/// Resolve the latest numeric release of every module in the catalog.
///
/// Modules without any eligible release are left out; the templater
/// reports them when a target actually requires them.
pub fn resolve(catalog: &ModuleCatalog) -> ResolvedModuleSet {
    let mut resolved = ResolvedModuleSet::new();

    for (module, versions) in catalog.iter() {
        match latest_numeric(versions) {
            Some(record) => {
                tracing::debug!(module, version = %record.version, "resolved module version");
                resolved.insert(module, record.version.clone());
            }
            None => {
                tracing::debug!(module, "no numeric release, skipping");
            }
        }
    }

    resolved
}

/// Pick the highest eligible release from a version list.
///
/// Versions sharing a numeric key keep their catalog order, so the one
/// listed last wins.
pub fn latest_numeric(versions: &[VersionRecord]) -> Option<&VersionRecord> {
    let mut eligible: Vec<(String, &VersionRecord)> = versions
        .iter()
        .filter_map(|record| numeric_key(&record.version).map(|key| (key, record)))
        .collect();

    // sort_by is stable: equal keys stay in insertion order
    eligible.sort_by(|(a, _), (b, _)| compare_numeric(a, b));
    eligible.pop().map(|(_, record)| record)
}

/// Dot-stripped numeric form of a version, or `None` when it is not purely numeric.
///
/// Leading zeros are dropped so the result compares by length first.
pub fn numeric_key(version: &str) -> Option<String> {
    let digits: String = version.chars().filter(|c| *c != '.').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    })
}

/// Compare two normalized digit strings as unbounded integers
fn compare_numeric(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
