//! Application tiers and their on-disk layout

use crate::error::{InstallerError, Result};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Top-level domain used when the operator does not pass one
pub const DEFAULT_TLD: &str = ".localhost";

/// Which application tier is being provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Front,
    Back,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Front => "front",
            Position::Back => "back",
        }
    }

    /// The other tier
    pub fn sibling(&self) -> Position {
        match self {
            Position::Front => Position::Back,
            Position::Back => Position::Front,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Turn a free-form application name into a directory-safe slug.
///
/// Every run of characters outside `[A-Za-z0-9_]` becomes a single `-`.
pub fn sanitize_app_name(raw: &str) -> Result<String> {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static regex"));

    let slug = re.replace_all(raw, "-").to_lowercase().trim().to_string();
    if slug.is_empty() || slug.chars().all(|c| c == '-') {
        return Err(InstallerError::InvalidAppName(raw.to_string()));
    }
    Ok(slug)
}

/// Normalize an optional top-level domain to a leading-dot form
pub fn normalize_tld(tld: Option<&str>) -> String {
    match tld.map(str::trim) {
        None | Some("") => DEFAULT_TLD.to_string(),
        Some(t) if t.starts_with('.') => t.to_string(),
        Some(t) => format!(".{}", t),
    }
}

/// One application tier to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub position: Position,
    pub app_name: String,
    pub tld: String,
    /// Final location of the tier (`<project>/<app>-<position>`)
    pub directory: PathBuf,
}

impl TargetSpec {
    /// Lay out a tier inside the project directory
    pub fn new(position: Position, app_name: &str, tld: &str, project_dir: &Path) -> Self {
        Self {
            position,
            app_name: app_name.to_string(),
            tld: tld.to_string(),
            directory: project_dir.join(folder_name(app_name, position)),
        }
    }

    /// `http://<position>.<app><tld>`
    pub fn app_url(&self) -> String {
        tier_url(&self.app_name, &self.tld, self.position)
    }

    /// URL of the other tier
    pub fn sibling_url(&self) -> String {
        tier_url(&self.app_name, &self.tld, self.position.sibling())
    }

    /// Folder name of this tier
    pub fn folder_name(&self) -> String {
        folder_name(&self.app_name, self.position)
    }

    /// Folder name of the other tier
    pub fn sibling_folder_name(&self) -> String {
        folder_name(&self.app_name, self.position.sibling())
    }
}

fn tier_url(app_name: &str, tld: &str, position: Position) -> String {
    format!("http://{}.{}{}", position, app_name, tld)
}

fn folder_name(app_name: &str, position: Position) -> String {
    format!("{}-{}", app_name, position)
}
