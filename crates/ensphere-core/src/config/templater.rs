//! Manifest and environment templating for a provisioned tier
//!
//! Templating happens in two phases. [`ManifestTemplater::plan`] validates
//! the module requirements and patches the manifest in memory. Only then does
//! [`TemplatePlan::write`] render the environment file with the database
//! credentials and overwrite both files. A missing module therefore never
//! leaves a half-written manifest behind, and it is reported before the
//! operator is asked for credentials.

use super::env::{
    application_settings, render_env, sandbox_settings, EnvironmentSettings, HostEnvironment,
    ENV_EXAMPLE_FILE, ENV_FILE, ENV_TEMPLATE, SANDBOX_URL,
};
use super::manifest::{caret_constraint, PackageManifest, MANIFEST_FILE};
use crate::credentials::DatabaseCredentials;
use crate::error::{InstallerError, Result};
use crate::modules::ResolvedModuleSet;
use crate::provision::target::{Position, TargetSpec};
use std::path::{Path, PathBuf};

/// Requirement constraint used for sandbox modules
pub const WILDCARD_CONSTRAINT: &str = "*";

/// Files written by a templating run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatedFiles {
    pub manifest: PathBuf,
    pub env: PathBuf,
}

/// A validated, not yet written templating run
#[derive(Debug, Clone)]
pub struct TemplatePlan {
    manifest: PackageManifest,
    manifest_path: PathBuf,
    settings: EnvironmentSettings,
    app_url: String,
    env_path: PathBuf,
}

impl TemplatePlan {
    /// The patched manifest that will be written
    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    /// Overwrite the manifest and environment file
    pub fn write(&self, db: &DatabaseCredentials) -> Result<TemplatedFiles> {
        let env = render_env(ENV_TEMPLATE, &self.app_url, &self.settings, db);

        self.manifest.write(&self.manifest_path)?;
        std::fs::write(&self.env_path, env)?;

        tracing::info!(
            manifest = %self.manifest_path.display(),
            env = %self.env_path.display(),
            "templated application files"
        );

        Ok(TemplatedFiles {
            manifest: self.manifest_path.clone(),
            env: self.env_path.clone(),
        })
    }
}

/// Writes `composer.json` and the environment file of a tier
#[derive(Debug, Clone)]
pub struct ManifestTemplater<'a> {
    host: &'a HostEnvironment,
    asset_pins: &'a [(&'static str, &'static str)],
}

impl<'a> ManifestTemplater<'a> {
    pub fn new(host: &'a HostEnvironment, asset_pins: &'a [(&'static str, &'static str)]) -> Self {
        Self { host, asset_pins }
    }

    /// Plan a full-application tier: caret-pinned modules and `.env.example`
    pub fn plan(
        &self,
        target: &TargetSpec,
        resolved: &ResolvedModuleSet,
        required: &[&str],
    ) -> Result<TemplatePlan> {
        let requirements = pinned_requirements(required, resolved, target.position)?;
        let manifest = self.patch_manifest(&target.directory, target.position, requirements)?;

        Ok(TemplatePlan {
            manifest,
            manifest_path: target.directory.join(MANIFEST_FILE),
            settings: application_settings(target, self.host),
            app_url: target.app_url(),
            env_path: target.directory.join(ENV_EXAMPLE_FILE),
        })
    }

    /// Plan and write a full-application tier in one go
    pub fn template(
        &self,
        target: &TargetSpec,
        resolved: &ResolvedModuleSet,
        required: &[&str],
        db: &DatabaseCredentials,
    ) -> Result<TemplatedFiles> {
        self.plan(target, resolved, required)?.write(db)
    }

    /// Plan a single-module sandbox: wildcard requirements and a live `.env`
    pub fn plan_sandbox(
        &self,
        directory: &Path,
        position: Position,
        required: &[&str],
    ) -> Result<TemplatePlan> {
        let requirements = required
            .iter()
            .map(|module| (module.to_string(), WILDCARD_CONSTRAINT.to_string()))
            .collect();
        let manifest = self.patch_manifest(directory, position, requirements)?;
        let folder = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(TemplatePlan {
            manifest,
            manifest_path: directory.join(MANIFEST_FILE),
            settings: sandbox_settings(position, &folder, self.host),
            app_url: SANDBOX_URL.to_string(),
            env_path: directory.join(ENV_FILE),
        })
    }

    fn patch_manifest(
        &self,
        directory: &Path,
        position: Position,
        requirements: Vec<(String, String)>,
    ) -> Result<PackageManifest> {
        let mut manifest = PackageManifest::load(&directory.join(MANIFEST_FILE))?;
        for (module, constraint) in requirements {
            manifest.require(module, constraint);
        }
        if position == Position::Front {
            for (package, constraint) in self.asset_pins {
                manifest.pin_asset(package, constraint);
            }
        }
        Ok(manifest)
    }
}

/// Caret requirement for every required module, failing on the first one without a release
pub fn pinned_requirements(
    required: &[&str],
    resolved: &ResolvedModuleSet,
    position: Position,
) -> Result<Vec<(String, String)>> {
    required
        .iter()
        .map(|module| {
            resolved
                .get(module)
                .map(|version| (module.to_string(), caret_constraint(version)))
                .ok_or_else(|| InstallerError::MissingModuleVersion {
                    module: module.to_string(),
                    position: position.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::target::DEFAULT_TLD;
    use tempfile::TempDir;

    const SKELETON: &str = r#"{
    "name": "ensphere/ensphere",
    "require": {
        "php": ">=5.6.4"
    },
    "config": {
        "preferred-install": "dist"
    }
}"#;

    const PINS: &[(&str, &str)] = &[("jquery", "^1.8.0")];

    fn host() -> HostEnvironment {
        HostEnvironment {
            home: "/home/dev".to_string(),
            path: "/usr/bin".to_string(),
        }
    }

    fn db() -> DatabaseCredentials {
        DatabaseCredentials {
            host: "localhost".to_string(),
            port: 3306,
            name: "acme".to_string(),
            user: "acme".to_string(),
            password: "secret".to_string(),
            using_local_socket: false,
        }
    }

    fn resolved() -> ResolvedModuleSet {
        [
            ("purposemedia/sites", "2.1.7"),
            ("purposemedia/users", "2.3.5"),
            ("purposemedia/front-pages", "1.0.2"),
        ]
        .into_iter()
        .collect()
    }

    fn setup(position: Position) -> (TempDir, TargetSpec) {
        let project = TempDir::new().unwrap();
        let target = TargetSpec::new(position, "acme-shop", DEFAULT_TLD, project.path());
        std::fs::create_dir_all(&target.directory).unwrap();
        std::fs::write(target.directory.join(MANIFEST_FILE), SKELETON).unwrap();
        (project, target)
    }

    #[test]
    fn test_back_requirements_are_caret_pinned() {
        let (_project, target) = setup(Position::Back);
        let host = host();
        let templater = ManifestTemplater::new(&host, PINS);
        let required = ["purposemedia/sites", "purposemedia/users"];

        templater.template(&target, &resolved(), &required, &db()).unwrap();

        let manifest = PackageManifest::load(&target.directory.join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.requirements.get("purposemedia/sites").unwrap(), "^2.1");
        assert_eq!(manifest.requirements.get("purposemedia/users").unwrap(), "^2.3");
        // php plus exactly one entry per required module
        assert_eq!(manifest.requirements.len(), 3);
        assert!(manifest.asset_pin("jquery").is_none());

        let env = std::fs::read_to_string(target.directory.join(ENV_EXAMPLE_FILE)).unwrap();
        assert!(env.contains("FRONT_END_URL=http://front.acme-shop.localhost"));
    }

    #[test]
    fn test_front_gets_asset_pin() {
        let (_project, target) = setup(Position::Front);
        let host = host();
        let templater = ManifestTemplater::new(&host, PINS);

        templater
            .template(&target, &resolved(), &["purposemedia/front-pages"], &db())
            .unwrap();

        let manifest = PackageManifest::load(&target.directory.join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.asset_pin("jquery"), Some("^1.8.0"));
        assert_eq!(manifest.requirements.get("purposemedia/front-pages").unwrap(), "^1.0");

        let env = std::fs::read_to_string(target.directory.join(ENV_EXAMPLE_FILE)).unwrap();
        assert!(env.contains("FILESYSTEM_ROOT=../acme-shop-back/storage/app"));
    }

    #[test]
    fn test_missing_module_writes_nothing() {
        let (_project, target) = setup(Position::Back);
        let host = host();
        let templater = ManifestTemplater::new(&host, PINS);
        let required = ["purposemedia/sites", "purposemedia/authentication"];

        let err = templater
            .template(&target, &resolved(), &required, &db())
            .unwrap_err();
        match err {
            InstallerError::MissingModuleVersion { module, position } => {
                assert_eq!(module, "purposemedia/authentication");
                assert_eq!(position, "back");
            }
            other => panic!("unexpected error: {other}"),
        }

        let manifest = std::fs::read_to_string(target.directory.join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest, SKELETON);
        assert!(!target.directory.join(ENV_EXAMPLE_FILE).exists());
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let (_project, target) = setup(Position::Front);
        let host = host();
        let templater = ManifestTemplater::new(&host, PINS);
        let required = ["purposemedia/front-pages"];

        let files = templater.template(&target, &resolved(), &required, &db()).unwrap();
        let manifest_first = std::fs::read(&files.manifest).unwrap();
        let env_first = std::fs::read(&files.env).unwrap();

        templater.template(&target, &resolved(), &required, &db()).unwrap();
        assert_eq!(std::fs::read(&files.manifest).unwrap(), manifest_first);
        assert_eq!(std::fs::read(&files.env).unwrap(), env_first);
    }

    #[test]
    fn test_sandbox_uses_wildcards_and_live_env() {
        let project = TempDir::new().unwrap();
        let dir = project.path().join("_admin-contact-form");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), SKELETON).unwrap();

        let host = host();
        let templater = ManifestTemplater::new(&host, PINS);
        let files = templater
            .plan_sandbox(&dir, Position::Back, &["purposemedia/sites", "purposemedia/users"])
            .unwrap()
            .write(&db())
            .unwrap();

        assert_eq!(files.env, dir.join(ENV_FILE));
        let manifest = PackageManifest::load(&files.manifest).unwrap();
        assert_eq!(manifest.requirements.get("purposemedia/sites").unwrap(), "*");

        let env = std::fs::read_to_string(&files.env).unwrap();
        assert!(env.contains("APP_URL=http://localhost:8000"));
        assert!(env.contains("FRONT_END_FOLDER=_admin-contact-form"));
    }
}
