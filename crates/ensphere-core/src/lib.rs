//! Ensphere Core - provisioning pipeline for two-tier Ensphere applications
//!
//! An Ensphere application is a `front` site and a `back` admin application,
//! each built from the same template repository and wired to the latest
//! numeric release of a fixed set of modules.
//!
//! # Architecture
//!
//! - **Layer 1: Core Operations** - catalog fetching and version resolution,
//!   manifest/env templating, archive fetching, command running, seeding
//! - **Layer 2: Workflow Orchestration** - the per-tier state machine,
//!   `Installer` for the two-tier pipeline and `SandboxBuilder` for module sandboxes
//! - **Layer 3: CLI/TUI Interface** - optional cliclack prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use ensphere_core::{CredentialStore, FixedPrompt, InstallRequest, Installer};
//!
//! let installer = Installer::from_config(MyConfig)?;
//! let mut credentials = CredentialStore::new(FixedPrompt::new(details), request);
//! let summary = installer.install(&install_request, &mut credentials).await?;
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod modules;
pub mod product;
pub mod provision;
pub mod release;
pub mod runtime;
pub mod seed;
pub mod templates;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use credentials::{
    CredentialPrompt, CredentialRequest, CredentialStore, DatabaseCredentials, FixedPrompt,
    OperatorDetails,
};
pub use error::{InstallerError, Result};
pub use modules::{resolve, CatalogClient, ModuleCatalog, ResolvedModuleSet, VersionRecord};
pub use product::ProductConfig;
pub use provision::{
    InstallRequest, InstallSummary, Installer, Position, ProvisionStage, SandboxBuilder,
    SandboxRequest, TargetSpec,
};
pub use runtime::{CommandRunner, RuntimeInfo, ShellRunner};
pub use seed::{MySqlSeeder, Seeder};
pub use templates::{ArchiveFetcher, ArchiveSource};

#[cfg(feature = "tui")]
pub use tui::{run_new, run_sandbox};
