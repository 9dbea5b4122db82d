//! Charm-style CLI prompts using cliclack

use crate::credentials::{
    require_answer, CredentialPrompt, CredentialRequest, CredentialStore, DatabaseCredentials,
    OperatorDetails,
};
use crate::error::{InstallerError, Result as InstallResult};
use crate::product::ProductConfig;
use crate::provision::{
    InstallRequest, InstallSummary, Installer, Position, SandboxBuilder, SandboxRequest,
    SandboxSummary,
};
use crate::release::ReleaseChecker;
use crate::runtime::check;
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// CLI arguments for the `new` command
#[derive(Debug, Clone, Default)]
pub struct NewArgs {
    /// Application name as typed
    pub name: String,

    /// Top-level domain for the tier URLs
    pub tld: Option<String>,

    /// Skip the installer version check
    pub skip_version_check: bool,
}

/// CLI arguments for the module sandbox commands
#[derive(Debug, Clone)]
pub struct SandboxArgs {
    pub name: String,
    pub position: Position,
    pub skip_version_check: bool,
}

/// Asks for database credentials (and the admin email) with cliclack prompts
#[derive(Debug, Default)]
pub struct CliclackPrompt;

impl CliclackPrompt {
    pub fn new() -> Self {
        Self
    }
}

fn ask_text(prompt: &str, default: Option<&str>) -> std::io::Result<String> {
    let mut input = cliclack::input(prompt).required(false);
    if let Some(value) = default {
        input = input.placeholder(value).default_input(value);
    }
    input.interact()
}

impl CredentialPrompt for CliclackPrompt {
    fn ask(&mut self, request: &CredentialRequest) -> InstallResult<OperatorDetails> {
        let defaults = &request.defaults;
        cliclack::log::warning("Set up your database before entering its details!")?;

        let using_local_socket: bool = cliclack::confirm("Are you using MAMP?")
            .initial_value(false)
            .interact()?;

        let host = require_answer(
            "database host",
            ask_text("Database host", defaults.host.as_deref())?,
        )?;

        let port_default = defaults.port.map(|p| p.to_string());
        let port = require_answer(
            "database port",
            ask_text("Database port", port_default.as_deref())?,
        )?;
        let port: u16 = port
            .parse()
            .map_err(|_| InstallerError::rejected("valid database port"))?;

        let name = require_answer("database name", ask_text("Database name", None)?)?;
        let user = require_answer(
            "database user",
            ask_text("Database user", defaults.user.as_deref())?,
        )?;

        let password = match defaults.password.as_deref() {
            Some(default) => ask_text("Database password", Some(default))?,
            None => cliclack::password("Database password").mask('▪').interact()?,
        };
        let password = require_answer("database password", password)?;

        let email = if request.ask_email {
            let email = require_answer(
                "valid email address",
                ask_text("Email address (required for admin login)", None)?,
            )?;
            if !email.contains('@') {
                return Err(InstallerError::rejected("valid email address"));
            }
            Some(email)
        } else {
            None
        };

        Ok(OperatorDetails {
            database: DatabaseCredentials {
                host,
                port,
                name,
                user,
                password,
                using_local_socket,
            },
            email,
        })
    }
}

/// Run the `new` command with interactive prompts
pub async fn run_new<C: ProductConfig>(
    config: &C,
    args: NewArgs,
    cli_version: &str,
) -> Result<InstallSummary> {
    cliclack::intro(config.display_name())?;

    if !args.skip_version_check {
        check_installer_version(config, cli_version).await?;
    }
    check_toolchain()?;

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let request = InstallRequest {
        raw_name: args.name,
        tld: args.tld,
        cwd,
    };

    let installer = Installer::from_config(config.clone())?;
    let mut credentials = CredentialStore::new(
        CliclackPrompt::new(),
        CredentialRequest {
            defaults: crate::credentials::CredentialDefaults::application(),
            ask_email: true,
        },
    );

    cliclack::log::step("Creating back and front applications...")?;
    let summary = match installer.install(&request, &mut credentials).await {
        Ok(summary) => summary,
        Err(e) => {
            cliclack::log::error(format!("{}", e))?;
            return Err(e.into());
        }
    };

    print_summary(&summary);
    cliclack::outro(format!("{} application ready", config.display_name()))?;
    Ok(summary)
}

/// Run one of the module sandbox commands
pub async fn run_sandbox<C: ProductConfig>(
    config: &C,
    args: SandboxArgs,
    cli_version: &str,
) -> Result<SandboxSummary> {
    cliclack::intro(config.display_name())?;

    if !args.skip_version_check {
        check_installer_version(config, cli_version).await?;
    }
    check_toolchain()?;

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let request = SandboxRequest {
        raw_name: args.name,
        position: args.position,
        cwd,
    };

    let builder = SandboxBuilder::from_config(config.clone());
    let mut credentials = CredentialStore::new(
        CliclackPrompt::new(),
        CredentialRequest {
            defaults: crate::credentials::CredentialDefaults::sandbox(),
            ask_email: false,
        },
    );

    let summary = match builder.create(&request, &mut credentials).await {
        Ok(summary) => summary,
        Err(e) => {
            cliclack::log::error(format!("{}", e))?;
            return Err(e.into());
        }
    };

    cliclack::log::success(format!("Module sandbox created in {}", summary.directory.display()))?;
    cliclack::outro(format!("Serve it with `php artisan serve` and open {}", summary.url))?;
    Ok(summary)
}

async fn check_installer_version<C: ProductConfig>(config: &C, cli_version: &str) -> Result<()> {
    let checker = match ReleaseChecker::from_config(config) {
        Ok(checker) => checker,
        Err(e) => {
            tracing::debug!(error = %e, "release listing not configured");
            return Ok(());
        }
    };

    let spinner = cliclack::spinner();
    spinner.start("Checking for installer updates...");
    match checker.check(cli_version).await {
        Some(warning) => {
            spinner.stop("A newer installer is available");
            cliclack::log::warning(warning)?;
        }
        None => spinner.stop(format!("Installer {} is up to date", cli_version)),
    }
    Ok(())
}

fn check_toolchain() -> Result<()> {
    let spinner = cliclack::spinner();
    spinner.start("Checking toolchain...");

    match check::check_toolchain() {
        Ok(tools) => {
            let info: Vec<String> = tools
                .iter()
                .map(|t| {
                    if t.available {
                        format!("{} ({})", t.name, t.version.as_deref().unwrap_or("unknown"))
                    } else {
                        format!("{} (not installed)", t.name)
                    }
                })
                .collect();
            spinner.stop(format!("Detected: {}", info.join(", ")));
            Ok(())
        }
        Err(e) => {
            spinner.stop("Missing toolchain");
            cliclack::log::error(format!("{}", e))?;
            anyhow::bail!("Please install PHP and try again.");
        }
    }
}

fn print_summary(summary: &InstallSummary) {
    println!();
    println!("{}", "Your Ensphere application is successfully installed!".green());
    println!();
    println!("{}", "Credentials:".blue());
    println!();
    println!("{}    {}", "Front URL:".yellow(), summary.front_url.green());
    println!("{}     {}", "Back URL:".yellow(), summary.back_url.green());
    println!();
    println!("{}        {}", "Email:".yellow(), summary.email.green());
    println!("{}     {}", "Password:".yellow(), summary.password.green());
    println!();
}
