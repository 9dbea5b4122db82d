//! Error taxonomy for the provisioning pipeline
//!
//! Every variant is terminal for the current run. Nothing is retried and
//! nothing is rolled back; the error simply propagates up to the binary.

use crate::provision::state::TransitionError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the installer
#[derive(Error, Debug)]
pub enum InstallerError {
    /// Target directory (or project directory) already exists
    #[error("{message} ({})", .path.display())]
    PreconditionFailed { path: PathBuf, message: String },

    /// A required module has no resolved version in the catalog
    #[error("No publishable version of required module '{module}' found for the {position} application")]
    MissingModuleVersion { module: String, position: String },

    /// Template archive could not be downloaded
    #[error("Failed to fetch template archive from {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// Template archive could not be extracted
    #[error("Failed to extract template archive: {0}")]
    ExtractFailed(String),

    /// An external command exited non-zero or could not be started
    #[error("Step '{step}' failed ({command}) with exit code {}{}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()), format_output(.output))]
    ExternalCommandFailed {
        step: String,
        command: String,
        code: Option<i32>,
        output: Vec<String>,
    },

    /// The operator left a required prompt empty
    #[error("You must supply a {field} to complete the installation process.")]
    CredentialInputRejected { field: String },

    /// The module catalog could not be fetched or parsed
    #[error("Module catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A package manifest could not be read or written
    #[error("Invalid package manifest {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// The application name sanitized to nothing
    #[error("Invalid application name '{0}'")]
    InvalidAppName(String),

    /// Provisioning state machine was driven out of order
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Seeding the admin user or site failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO errors (file operations, prompts, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallerError>;

fn format_output(output: &[String]) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!("\n{}", output.join("\n"))
    }
}

impl InstallerError {
    /// Create a precondition error for a path that is already taken
    pub fn already_exists(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an extraction error
    pub fn extract(msg: impl Into<String>) -> Self {
        Self::ExtractFailed(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::CatalogUnavailable(msg.into())
    }

    /// Create a rejected-input error for the named prompt field
    pub fn rejected(field: impl Into<String>) -> Self {
        Self::CredentialInputRejected {
            field: field.into(),
        }
    }
}
