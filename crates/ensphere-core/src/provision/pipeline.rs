//! Two-tier installation pipeline
//!
//! ```text
//! sanitize name -> check project dir -> load + resolve catalog
//!     -> validate module requirements for both tiers
//!     -> provision back -> provision front -> summary
//! ```
//!
//! The tiers run strictly one after the other. A failure in the back tier
//! means the front tier is never attempted.

use super::provisioner::{ProvisionedTarget, SeedProfile, TargetJob, TargetProvisioner};
use super::target::{normalize_tld, sanitize_app_name, Position, TargetSpec};
use crate::config::env::HostEnvironment;
use crate::config::templater::{pinned_requirements, ManifestTemplater};
use crate::credentials::{CredentialPrompt, CredentialStore};
use crate::error::{InstallerError, Result};
use crate::modules::{resolve, CatalogClient, ResolvedModuleSet};
use crate::product::ProductConfig;
use crate::runtime::command::{CommandRunner, ShellRunner};
use crate::seed::{generate_password, title_case, MySqlSeeder, Seeder};
use crate::templates::ArchiveFetcher;
use std::path::PathBuf;
use std::sync::Arc;

/// What the operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Application name as typed
    pub raw_name: String,
    pub tld: Option<String>,
    /// Directory the project folder is created in
    pub cwd: PathBuf,
}

/// Result of a successful installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSummary {
    pub app_name: String,
    pub project_dir: PathBuf,
    pub front_url: String,
    pub back_url: String,
    pub email: String,
    pub password: String,
}

/// Orchestrates catalog resolution and both tier provisioners
pub struct Installer<C: ProductConfig> {
    config: C,
    catalog: CatalogClient,
    fetcher: ArchiveFetcher,
    runner: Arc<dyn CommandRunner>,
    seeder: Arc<dyn Seeder>,
    host: HostEnvironment,
}

impl<C: ProductConfig> Installer<C> {
    pub fn new(
        config: C,
        catalog: CatalogClient,
        fetcher: ArchiveFetcher,
        runner: Arc<dyn CommandRunner>,
        seeder: Arc<dyn Seeder>,
        host: HostEnvironment,
    ) -> Self {
        Self {
            config,
            catalog,
            fetcher,
            runner,
            seeder,
            host,
        }
    }

    /// Installer wired to the real endpoints, shell and database
    pub fn from_config(config: C) -> Result<Self> {
        let catalog = CatalogClient::from_config(&config)?;
        let fetcher = ArchiveFetcher::from_config(&config)?;
        let host = HostEnvironment::capture();
        let runner = Arc::new(ShellRunner::for_home(&host.home));
        Ok(Self::new(
            config,
            catalog,
            fetcher,
            runner,
            Arc::new(MySqlSeeder::new()),
            host,
        ))
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Run the full installation
    pub async fn install<P: CredentialPrompt>(
        &self,
        request: &InstallRequest,
        credentials: &mut CredentialStore<P>,
    ) -> Result<InstallSummary> {
        let app_name = sanitize_app_name(&request.raw_name)?;
        let tld = normalize_tld(request.tld.as_deref());
        let project_dir = request.cwd.join(&app_name);

        if project_dir.exists() {
            return Err(InstallerError::already_exists(
                &project_dir,
                "Application already exists!",
            ));
        }

        let catalog = self.catalog.fetch_catalog().await?;
        let resolved = resolve(&catalog);
        self.validate_requirements(&resolved)?;

        std::fs::create_dir_all(&project_dir)?;
        tracing::info!(app = %app_name, project = %project_dir.display(), "installing application");

        let back = TargetSpec::new(Position::Back, &app_name, &tld, &project_dir);
        let front = TargetSpec::new(Position::Front, &app_name, &tld, &project_dir);
        let profile = SeedProfile {
            operator_name: self.config.operator_name().to_string(),
            site_name: title_case(request.raw_name.trim()),
            password: generate_password(),
        };

        let templater = ManifestTemplater::new(&self.host, self.config.asset_pins());
        let provisioner = TargetProvisioner::new(
            &self.fetcher,
            templater,
            self.runner.as_ref(),
            self.seeder.as_ref(),
        );

        let back_job = TargetJob {
            target: &back,
            resolved: &resolved,
            required: self.config.required_modules(Position::Back),
            seed: Some(&profile),
        };
        let provisioned_back = provisioner.provision(&back_job, &project_dir, credentials).await?;

        let front_job = TargetJob {
            target: &front,
            resolved: &resolved,
            required: self.config.required_modules(Position::Front),
            seed: None,
        };
        provisioner.provision(&front_job, &project_dir, credentials).await?;

        Ok(summarize(app_name, project_dir, &front, provisioned_back))
    }

    /// Both tiers' requirements must resolve before anything runs
    fn validate_requirements(&self, resolved: &ResolvedModuleSet) -> Result<()> {
        for position in [Position::Back, Position::Front] {
            pinned_requirements(self.config.required_modules(position), resolved, position)?;
        }
        Ok(())
    }
}

fn summarize(
    app_name: String,
    project_dir: PathBuf,
    front: &TargetSpec,
    back: ProvisionedTarget,
) -> InstallSummary {
    let (email, password) = back
        .admin
        .map(|admin| (admin.email, admin.password))
        .unwrap_or_default();

    InstallSummary {
        app_name,
        project_dir,
        front_url: front.app_url(),
        back_url: back.target.app_url(),
        email,
        password,
    }
}
