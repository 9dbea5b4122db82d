//! Application provisioning
//!
//! - `target`: tiers, naming and on-disk layout
//! - `state`: per-tier stage machine
//! - `provisioner`: runs one tier through its stages
//! - `pipeline`: the two-tier `new` installation
//! - `sandbox`: single-module development sandboxes

pub mod pipeline;
pub mod provisioner;
pub mod sandbox;
pub mod state;
pub mod target;

pub use pipeline::{InstallRequest, InstallSummary, Installer};
pub use provisioner::{ProvisionedTarget, SeedProfile, TargetJob, TargetProvisioner};
pub use sandbox::{sandbox_folder, SandboxBuilder, SandboxRequest, SandboxSummary};
pub use state::{ProvisionContext, ProvisionStage, TransitionError};
pub use target::{normalize_tld, sanitize_app_name, Position, TargetSpec, DEFAULT_TLD};
