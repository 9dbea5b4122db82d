//! Ensphere CLI - provisioning for Ensphere applications and module sandboxes

use anyhow::Result;
use clap::{Parser, Subcommand};
use ensphere_core::tui::{NewArgs, SandboxArgs};
use ensphere_core::{Position, ProductConfig};

/// CLI version
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

const FRONT_REQUIRED: &[&str] = &[
    "purposemedia/front-banners",
    "purposemedia/front-blog",
    "purposemedia/front-contact",
    "purposemedia/front-container",
    "purposemedia/front-customers",
    "purposemedia/front-delivery",
    "purposemedia/front-faqs",
    "purposemedia/front-feeds",
    "purposemedia/front-form-builder",
    "purposemedia/front-mailing-list",
    "purposemedia/front-media-manager",
    "purposemedia/front-menu-manager",
    "purposemedia/front-pages",
    "purposemedia/front-post-types",
    "purposemedia/front-redirects",
    "purposemedia/front-search",
    "purposemedia/front-shop",
    "purposemedia/front-sitemap",
    "purposemedia/front-sites",
    "purposemedia/front-snippets",
    "purposemedia/front-social-feeds",
    "purposemedia/front-ads-manager",
    "purposemedia/front-multibuy",
];

const BACK_REQUIRED: &[&str] = &[
    "purposemedia/sites",
    "purposemedia/users",
    "purposemedia/admin-ads-manager",
    "purposemedia/admin-banners",
    "purposemedia/admin-blog",
    "purposemedia/admin-contact",
    "purposemedia/admin-customers",
    "purposemedia/admin-delivery",
    "purposemedia/admin-faqs",
    "purposemedia/admin-feeds",
    "purposemedia/admin-form-builder",
    "purposemedia/admin-mailing-list",
    "purposemedia/admin-media-manager",
    "purposemedia/admin-menu-manager",
    "purposemedia/admin-multibuy",
    "purposemedia/admin-pages",
    "purposemedia/admin-post-types",
    "purposemedia/admin-redirects",
    "purposemedia/admin-search-modules",
    "purposemedia/admin-settings",
    "purposemedia/admin-shop",
    "purposemedia/admin-snippets",
    "purposemedia/admin-social-feeds",
    "purposemedia/authentication",
];

const FRONT_SANDBOX: &[&str] = &["purposemedia/front-container", "purposemedia/front-sites"];

const BACK_SANDBOX: &[&str] = &[
    "purposemedia/sites",
    "purposemedia/users",
    "purposemedia/authentication",
];

/// Ensphere product configuration
#[derive(Clone)]
pub struct EnsphereConfig;

impl ProductConfig for EnsphereConfig {
    fn name(&self) -> &'static str {
        "ensphere"
    }

    fn display_name(&self) -> &'static str {
        "Ensphere"
    }

    fn default_archive_url(&self) -> &'static str {
        "https://codeload.github.com/ensphere/ensphere/zip/master"
    }

    fn archive_url_env(&self) -> &'static str {
        "ENSPHERE_ARCHIVE_URL"
    }

    fn default_modules_url(&self) -> &'static str {
        "https://modules.testing.pm/"
    }

    fn modules_url_env(&self) -> &'static str {
        "ENSPHERE_MODULES_URL"
    }

    fn default_releases_url(&self) -> &'static str {
        "https://packagist.org/p/ensphere/installer.json"
    }

    fn releases_url_env(&self) -> &'static str {
        "ENSPHERE_RELEASES_URL"
    }

    fn installer_package(&self) -> &'static str {
        "ensphere/installer"
    }

    fn required_modules(&self, position: Position) -> &'static [&'static str] {
        match position {
            Position::Front => FRONT_REQUIRED,
            Position::Back => BACK_REQUIRED,
        }
    }

    fn sandbox_modules(&self, position: Position) -> &'static [&'static str] {
        match position {
            Position::Front => FRONT_SANDBOX,
            Position::Back => BACK_SANDBOX,
        }
    }

    fn asset_pins(&self) -> &'static [(&'static str, &'static str)] {
        &[("jquery", "^1.8.0")]
    }

    fn sandbox_skeleton(&self) -> &'static str {
        "ensphere/ensphere:dev-master"
    }

    fn operator_name(&self) -> &'static str {
        "Purpose Media"
    }

    fn upgrade_command(&self) -> &'static str {
        "composer global update \"ensphere/installer\""
    }
}

#[derive(Parser, Debug)]
#[command(name = "ensphere")]
#[command(about = "Create Ensphere applications and module sandboxes")]
#[command(version)]
pub struct Args {
    /// Skip the installer version check
    #[arg(long = "skip-version-check", global = true)]
    pub skip_version_check: bool,

    /// Show diagnostic logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new Ensphere application (back and front)
    New(NameArgs),
    /// Create a new front Ensphere module
    #[command(name = "new:front-module")]
    NewFrontModule(NameArgs),
    /// Create a new admin Ensphere module
    #[command(name = "new:admin-module")]
    NewAdminModule(NameArgs),
}

#[derive(Parser, Debug)]
pub struct NameArgs {
    /// Application or module name, e.g. "contact form"
    pub name: String,

    /// Top-level domain for the application URLs (default: .localhost)
    pub tld: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    ensphere_core::logging::init_cli_logger(args.verbose);
    let config = EnsphereConfig;

    let result = match args.command {
        Command::New(name_args) => {
            let new_args = NewArgs {
                name: name_args.name,
                tld: name_args.tld,
                skip_version_check: args.skip_version_check,
            };
            ensphere_core::run_new(&config, new_args, CLI_VERSION)
                .await
                .map(|_| ())
        }
        Command::NewFrontModule(name_args) => {
            run_sandbox(&config, name_args, Position::Front, args.skip_version_check).await
        }
        Command::NewAdminModule(name_args) => {
            run_sandbox(&config, name_args, Position::Back, args.skip_version_check).await
        }
    };

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}

async fn run_sandbox(
    config: &EnsphereConfig,
    name_args: NameArgs,
    position: Position,
    skip_version_check: bool,
) -> Result<()> {
    let sandbox_args = SandboxArgs {
        name: name_args.name,
        position,
        skip_version_check,
    };
    ensphere_core::run_sandbox(config, sandbox_args, CLI_VERSION).await?;
    Ok(())
}
