//! Single-module development sandboxes
//!
//! A sandbox is a fresh skeleton created with `composer create-project`,
//! wired to the modules a front or admin module is developed against and
//! served from `http://localhost:8000`.

use super::target::{sanitize_app_name, Position};
use crate::config::env::HostEnvironment;
use crate::config::templater::ManifestTemplater;
use crate::credentials::{CredentialPrompt, CredentialStore};
use crate::error::{InstallerError, Result};
use crate::product::ProductConfig;
use crate::runtime::command::{CommandRunner, ShellRunner};
use std::path::PathBuf;
use std::sync::Arc;

/// What the operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRequest {
    pub raw_name: String,
    pub position: Position,
    pub cwd: PathBuf,
}

/// A created sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSummary {
    pub directory: PathBuf,
    pub url: String,
}

/// Directory name of a sandbox: `_front-<app>` or `_admin-<app>`
pub fn sandbox_folder(position: Position, app_name: &str) -> String {
    let kind = match position {
        Position::Front => "front",
        Position::Back => "admin",
    };
    format!("_{}-{}", kind, app_name)
}

/// Creates module sandboxes
pub struct SandboxBuilder<C: ProductConfig> {
    config: C,
    runner: Arc<dyn CommandRunner>,
    host: HostEnvironment,
}

impl<C: ProductConfig> SandboxBuilder<C> {
    pub fn new(config: C, runner: Arc<dyn CommandRunner>, host: HostEnvironment) -> Self {
        Self {
            config,
            runner,
            host,
        }
    }

    /// Builder using the real shell
    pub fn from_config(config: C) -> Self {
        let host = HostEnvironment::capture();
        let runner = Arc::new(ShellRunner::for_home(&host.home));
        Self::new(config, runner, host)
    }

    pub async fn create<P: CredentialPrompt>(
        &self,
        request: &SandboxRequest,
        credentials: &mut CredentialStore<P>,
    ) -> Result<SandboxSummary> {
        let app_name = sanitize_app_name(&request.raw_name)?;
        let folder = sandbox_folder(request.position, &app_name);
        let directory = request.cwd.join(&folder);

        if directory.exists() {
            return Err(InstallerError::already_exists(
                &directory,
                "This module already exists.",
            ));
        }

        let create = format!(
            "composer create-project {} {}",
            self.config.sandbox_skeleton(),
            folder
        );
        self.runner
            .run("create-project", &create, &request.cwd)
            .await?;

        let templater = ManifestTemplater::new(&self.host, self.config.asset_pins());
        let plan = templater.plan_sandbox(
            &directory,
            request.position,
            self.config.sandbox_modules(request.position),
        )?;
        let db = credentials.get()?.database.clone();
        let files = plan.write(&db)?;
        tracing::debug!(env = %files.env.display(), "sandbox environment written");

        self.runner
            .run("update", "composer update", &directory)
            .await?;

        tracing::info!(directory = %directory.display(), "module sandbox created");
        Ok(SandboxSummary {
            directory,
            url: crate::config::env::SANDBOX_URL.to_string(),
        })
    }
}
