//! Drives one tier through its provisioning stages
//!
//! Each stage does its work and then records the transition. The first error
//! moves the context to `Failed` and is returned unchanged. Nothing that was
//! already written to disk is removed.

use super::state::{ProvisionContext, ProvisionStage};
use super::target::{Position, TargetSpec};
use crate::config::env::{ENV_EXAMPLE_FILE, ENV_FILE};
use crate::config::templater::ManifestTemplater;
use crate::credentials::{CredentialPrompt, CredentialStore};
use crate::error::{InstallerError, Result};
use crate::modules::ResolvedModuleSet;
use crate::runtime::check::ComposerCommand;
use crate::runtime::command::CommandRunner;
use crate::seed::{AdminUser, SeedRequest, Seeder, SiteRecord};
use crate::templates::ArchiveFetcher;
use std::path::Path;

/// Details of the operator account and site seeded into the back tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedProfile {
    pub operator_name: String,
    pub site_name: String,
    pub password: String,
}

/// A tier that reached `Completed`
#[derive(Debug, Clone)]
pub struct ProvisionedTarget {
    pub target: TargetSpec,
    pub context: ProvisionContext,
    /// Seeded admin account (back tier only)
    pub admin: Option<AdminUser>,
}

/// Everything one tier needs besides the shared services
pub struct TargetJob<'a> {
    pub target: &'a TargetSpec,
    pub resolved: &'a ResolvedModuleSet,
    pub required: &'a [&'static str],
    /// Seeding details; only used for the back tier
    pub seed: Option<&'a SeedProfile>,
}

/// Runs the stage sequence for a single tier
pub struct TargetProvisioner<'a> {
    fetcher: &'a ArchiveFetcher,
    templater: ManifestTemplater<'a>,
    runner: &'a dyn CommandRunner,
    seeder: &'a dyn Seeder,
}

impl<'a> TargetProvisioner<'a> {
    pub fn new(
        fetcher: &'a ArchiveFetcher,
        templater: ManifestTemplater<'a>,
        runner: &'a dyn CommandRunner,
        seeder: &'a dyn Seeder,
    ) -> Self {
        Self {
            fetcher,
            templater,
            runner,
            seeder,
        }
    }

    /// Provision `job.target` inside `project_dir`
    pub async fn provision<P: CredentialPrompt>(
        &self,
        job: &TargetJob<'_>,
        project_dir: &Path,
        credentials: &mut CredentialStore<P>,
    ) -> Result<ProvisionedTarget> {
        let mut ctx = ProvisionContext::new(job.target.position);
        tracing::info!(
            position = %job.target.position,
            directory = %job.target.directory.display(),
            "provisioning target"
        );

        match self.run_stages(&mut ctx, job, project_dir, credentials).await {
            Ok(admin) => Ok(ProvisionedTarget {
                target: job.target.clone(),
                context: ctx,
                admin,
            }),
            Err(e) => {
                ctx.fail();
                tracing::error!(
                    position = %job.target.position,
                    failed_at = ?ctx.failed_at(),
                    error = %e,
                    "provisioning aborted"
                );
                Err(e)
            }
        }
    }

    async fn run_stages<P: CredentialPrompt>(
        &self,
        ctx: &mut ProvisionContext,
        job: &TargetJob<'_>,
        project_dir: &Path,
        credentials: &mut CredentialStore<P>,
    ) -> Result<Option<AdminUser>> {
        let target = job.target;
        let dir = target.directory.as_path();

        let root = self.fetcher.fetch(project_dir).await?;
        ctx.transition_to(ProvisionStage::Fetched)?;

        relocate(&root, dir)?;
        ctx.transition_to(ProvisionStage::Relocated)?;

        let plan = self.templater.plan(target, job.resolved, job.required)?;
        let db = credentials.get()?.database.clone();
        plan.write(&db)?;
        ctx.transition_to(ProvisionStage::Templated)?;

        let composer = ComposerCommand::detect(dir);
        if composer.is_bundled() {
            self.run("self-update", &composer.command("self-update"), dir).await?;
        }
        self.run("install", &composer.command("install --no-scripts"), dir).await?;
        ctx.transition_to(ProvisionStage::Installed)?;

        std::fs::copy(dir.join(ENV_EXAMPLE_FILE), dir.join(ENV_FILE))?;
        self.run("key:generate", "php artisan key:generate", dir).await?;
        ctx.transition_to(ProvisionStage::KeyGenerated)?;

        self.run("update", &composer.command("update"), dir).await?;
        ctx.transition_to(ProvisionStage::Updated)?;

        let rename = format!(
            "php artisan ensphere:rename --vendor={} --module={}",
            target.app_name, target.position
        );
        self.run("rename", &rename, dir).await?;
        ctx.transition_to(ProvisionStage::Rebranded)?;

        self.run("publish", "php artisan vendor:publish --tag=install", dir).await?;
        ctx.transition_to(ProvisionStage::Published)?;

        let mut admin = None;
        if target.position == Position::Back {
            let profile = job.seed.ok_or_else(|| {
                InstallerError::rejected("operator profile for the back application")
            })?;
            let details = credentials.get()?;
            let email = details
                .email
                .clone()
                .ok_or_else(|| InstallerError::rejected("valid email address"))?;

            let request = SeedRequest {
                admin: AdminUser {
                    name: profile.operator_name.clone(),
                    email: email.clone(),
                    password: profile.password.clone(),
                },
                site: SiteRecord {
                    name: profile.site_name.clone(),
                    email,
                    front_end_url: target.sibling_url(),
                    front_end_folder: target.sibling_folder_name(),
                },
            };
            self.seeder.seed(&details.database, &request).await?;
            ctx.transition_to(ProvisionStage::Seeded)?;
            admin = Some(request.admin);
        }

        ctx.transition_to(ProvisionStage::Completed)?;
        tracing::info!(position = %target.position, "target provisioned");
        Ok(admin)
    }

    async fn run(&self, step: &str, command: &str, dir: &Path) -> Result<()> {
        self.runner.run(step, command, dir).await
    }
}

/// Move the extracted template root to the tier directory
fn relocate(root: &Path, directory: &Path) -> Result<()> {
    if directory.exists() {
        return Err(InstallerError::already_exists(
            directory,
            "Target directory already exists",
        ));
    }
    std::fs::rename(root, directory).map_err(|e| {
        InstallerError::already_exists(directory, format!("Could not move template into place: {}", e))
    })
}
