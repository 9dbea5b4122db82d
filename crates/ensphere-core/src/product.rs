//! Product configuration trait for the installer binary
//!
//! The binary implements this trait to describe where templates and module
//! catalogs live and which modules each application tier is built with.

use crate::provision::target::Position;

/// Configuration trait for the installer product
///
/// Covers:
/// - Product identity (name, display name)
/// - Remote endpoints, each overridable through an environment variable
/// - Module lists for the full application and for module sandboxes
/// - Fixed front-end asset pins
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for temp files, user agent)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Default URL of the zipped application template
    fn default_archive_url(&self) -> &'static str;

    /// Environment variable name for overriding the archive URL
    fn archive_url_env(&self) -> &'static str;

    /// Default base URL of the module catalog (composer repository)
    fn default_modules_url(&self) -> &'static str;

    /// Environment variable name for overriding the module catalog URL
    fn modules_url_env(&self) -> &'static str;

    /// Default URL of the installer's own release listing
    fn default_releases_url(&self) -> &'static str;

    /// Environment variable name for overriding the release listing URL
    fn releases_url_env(&self) -> &'static str;

    /// Package name of the installer in the release listing
    fn installer_package(&self) -> &'static str;

    /// Modules pinned into a full application of the given tier
    fn required_modules(&self, position: Position) -> &'static [&'static str];

    /// Modules wired into a single-module development sandbox
    fn sandbox_modules(&self, position: Position) -> &'static [&'static str];

    /// Front-end asset dependencies pinned under `extra.bower.require`
    fn asset_pins(&self) -> &'static [(&'static str, &'static str)];

    /// Skeleton package used by `composer create-project` for sandboxes
    fn sandbox_skeleton(&self) -> &'static str;

    /// Display name given to the seeded operator account
    fn operator_name(&self) -> &'static str;

    /// Upgrade/install command shown in version warnings
    fn upgrade_command(&self) -> &'static str;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }

    /// Resolve an endpoint, preferring the override variable when set
    fn endpoint(&self, env_var: &str, default: &str) -> String {
        std::env::var(env_var).unwrap_or_else(|_| default.to_string())
    }
}
