//! Toolchain detection for PHP and Composer

use crate::error::{InstallerError, Result};
use std::fmt;
use std::path::Path;
use std::process::Command;

/// Composer executable bundled by some application templates
pub const COMPOSER_PHAR: &str = "composer.phar";

/// Tool detection result
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub name: &'static str,
    pub version: Option<String>,
    pub available: bool,
}

fn probe(name: &'static str, program: &str) -> RuntimeInfo {
    let output = Command::new(program).arg("--version").output();

    match output {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout)
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            RuntimeInfo {
                name,
                version: Some(version),
                available: true,
            }
        }
        _ => RuntimeInfo {
            name,
            version: None,
            available: false,
        },
    }
}

/// Check if PHP is available
pub fn check_php() -> RuntimeInfo {
    probe("PHP", "php")
}

/// Check if a global Composer is available
pub fn check_composer() -> RuntimeInfo {
    probe("Composer", "composer")
}

/// Check the toolchain; PHP is required, a global Composer is only reported.
pub fn check_toolchain() -> Result<Vec<RuntimeInfo>> {
    let php = check_php();
    if !php.available {
        return Err(InstallerError::ExternalCommandFailed {
            step: "toolchain check".to_string(),
            command: "php --version".to_string(),
            code: None,
            output: vec!["PHP was not found on PATH (install from https://php.net)".to_string()],
        });
    }

    let composer = check_composer();
    if !composer.available {
        tracing::warn!("composer not found on PATH; templates must ship composer.phar");
    }

    Ok(vec![php, composer])
}

/// How Composer is invoked inside an application directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerCommand {
    /// `php composer.phar` shipped with the template
    Bundled,
    /// `composer` from `PATH`
    Global,
}

impl ComposerCommand {
    /// Prefer the template's own `composer.phar`
    pub fn detect(dir: &Path) -> Self {
        if dir.join(COMPOSER_PHAR).is_file() {
            Self::Bundled
        } else {
            Self::Global
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Self::Bundled => "php composer.phar",
            Self::Global => "composer",
        }
    }

    /// Full command line for a Composer sub-command
    pub fn command(&self, args: &str) -> String {
        format!("{} {}", self.program(), args)
    }

    pub fn is_bundled(&self) -> bool {
        matches!(self, Self::Bundled)
    }
}

impl fmt::Display for ComposerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())
    }
}
