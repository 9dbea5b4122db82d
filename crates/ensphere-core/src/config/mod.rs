//! Generated application files
//!
//! - `manifest`: typed, order-preserving `composer.json`
//! - `env`: environment settings and template rendering
//! - `templater`: both files written for one tier

pub mod env;
pub mod manifest;
pub mod templater;

pub use env::{HostEnvironment, EnvironmentSettings, ENV_EXAMPLE_FILE, ENV_FILE};
pub use manifest::{caret_constraint, PackageManifest, MANIFEST_FILE};
pub use templater::{ManifestTemplater, TemplatePlan, TemplatedFiles};
