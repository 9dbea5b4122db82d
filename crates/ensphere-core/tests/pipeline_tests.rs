use async_trait::async_trait;
use ensphere_core::config::{PackageManifest, ENV_EXAMPLE_FILE, ENV_FILE, MANIFEST_FILE};
use ensphere_core::config::env::HostEnvironment;
use ensphere_core::credentials::{CredentialDefaults, CredentialRequest};
use ensphere_core::runtime::{RecordingRunner, CommandRunner};
use ensphere_core::seed::RecordingSeeder;
use ensphere_core::{
    ArchiveFetcher, ArchiveSource, CatalogClient, CredentialStore, DatabaseCredentials,
    FixedPrompt, InstallRequest, Installer, InstallerError, OperatorDetails, Position,
    ProductConfig, SandboxBuilder, SandboxRequest,
};
use httpmock::prelude::*;
use httpmock::Mock;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const SKELETON: &str = r#"{
    "name": "ensphere/ensphere",
    "require": {
        "php": ">=5.6.4"
    },
    "extra": {
        "laravel": {
            "dont-discover": []
        }
    }
}"#;

#[derive(Clone)]
struct TestConfig;

impl ProductConfig for TestConfig {
    fn name(&self) -> &'static str {
        "ensphere"
    }
    fn display_name(&self) -> &'static str {
        "Ensphere"
    }
    fn default_archive_url(&self) -> &'static str {
        "http://127.0.0.1:9/archive.zip"
    }
    fn archive_url_env(&self) -> &'static str {
        "ENSPHERE_TEST_ARCHIVE_URL"
    }
    fn default_modules_url(&self) -> &'static str {
        "http://127.0.0.1:9/"
    }
    fn modules_url_env(&self) -> &'static str {
        "ENSPHERE_TEST_MODULES_URL"
    }
    fn default_releases_url(&self) -> &'static str {
        "http://127.0.0.1:9/installer.json"
    }
    fn releases_url_env(&self) -> &'static str {
        "ENSPHERE_TEST_RELEASES_URL"
    }
    fn installer_package(&self) -> &'static str {
        "ensphere/installer"
    }
    fn required_modules(&self, position: Position) -> &'static [&'static str] {
        match position {
            Position::Back => &["purposemedia/sites", "purposemedia/users"],
            Position::Front => &["purposemedia/front-pages"],
        }
    }
    fn sandbox_modules(&self, position: Position) -> &'static [&'static str] {
        match position {
            Position::Back => &["purposemedia/sites", "purposemedia/users"],
            Position::Front => &["purposemedia/front-container"],
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

fn operator() -> OperatorDetails {
    OperatorDetails {
        database: DatabaseCredentials {
            host: "127.0.0.1".to_string(),
            port: 3306,
            name: "acme".to_string(),
            user: "root".to_string(),
            password: "secret".to_string(),
            using_local_socket: false,
        },
        email: Some("ops@acme.test".to_string()),
    }
}

fn credentials() -> CredentialStore<FixedPrompt> {
    CredentialStore::new(
        FixedPrompt::new(operator()),
        CredentialRequest {
            defaults: CredentialDefaults::application(),
            ask_email: true,
        },
    )
}

fn host() -> HostEnvironment {
    HostEnvironment {
        home: "/home/dev".to_string(),
        path: "/usr/bin".to_string(),
    }
}

/// Template zip with a single `ensphere-master/` root
fn write_template(dir: &Path, with_phar: bool) -> PathBuf {
    let path = dir.join("template.zip");
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    zip.add_directory("ensphere-master/", options).unwrap();
    zip.start_file("ensphere-master/composer.json", options).unwrap();
    zip.write_all(SKELETON.as_bytes()).unwrap();
    zip.start_file("ensphere-master/artisan", options).unwrap();
    zip.write_all(b"#!/usr/bin/env php").unwrap();
    if with_phar {
        zip.start_file("ensphere-master/composer.phar", options).unwrap();
        zip.write_all(b"<?php").unwrap();
    }
    zip.finish().unwrap();
    path
}

async fn mock_catalog(server: &MockServer, include_users: bool) -> (Mock<'_>, Mock<'_>) {
    let index = server
        .mock_async(|when, then| {
            when.method(GET).path("/packages.json");
            then.status(200).json_body(serde_json::json!({
                "includes": { "include/all.json": { "sha1": "abc" } }
            }));
        })
        .await;

    let mut packages = serde_json::json!({
        "purposemedia/sites": {
            "2.1.6": { "name": "purposemedia/sites", "version": "2.1.6" },
            "2.1.7": { "name": "purposemedia/sites", "version": "2.1.7" },
            "dev-master": { "name": "purposemedia/sites", "version": "dev-master" }
        },
        "purposemedia/front-pages": {
            "1.0.2": { "name": "purposemedia/front-pages", "version": "1.0.2" },
            "1.1.0-beta": { "name": "purposemedia/front-pages", "version": "1.1.0-beta" }
        }
    });
    if include_users {
        packages["purposemedia/users"] = serde_json::json!({
            "2.3.5": { "name": "purposemedia/users", "version": "2.3.5" }
        });
    }

    let list = server
        .mock_async(move |when, then| {
            when.method(GET).path("/include/all.json");
            then.status(200)
                .json_body(serde_json::json!({ "packages": packages }));
        })
        .await;

    (index, list)
}

fn installer(
    server: &MockServer,
    template: &Path,
    runner: Arc<RecordingRunner>,
    seeder: Arc<RecordingSeeder>,
) -> Installer<TestConfig> {
    let catalog = CatalogClient::new(Url::parse(&server.base_url()).unwrap(), "ensphere");
    let fetcher = ArchiveFetcher::new(ArchiveSource::local(template), "ensphere");
    Installer::new(TestConfig, catalog, fetcher, runner, seeder, host())
}

fn request(cwd: &Path) -> InstallRequest {
    InstallRequest {
        raw_name: "Acme Shop".to_string(),
        tld: None,
        cwd: cwd.to_path_buf(),
    }
}

#[tokio::test]
async fn test_acme_shop_installs_both_tiers() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, true).await;
    let scratch = TempDir::new().unwrap();
    let template = write_template(scratch.path(), false);
    let cwd = TempDir::new().unwrap();

    let runner = Arc::new(RecordingRunner::new());
    let seeder = Arc::new(RecordingSeeder::new());
    let installer = installer(&server, &template, runner.clone(), seeder.clone());
    let mut credentials = credentials();

    let summary = installer.install(&request(cwd.path()), &mut credentials).await.unwrap();

    assert_eq!(summary.app_name, "acme-shop");
    assert_eq!(summary.back_url, "http://back.acme-shop.localhost");
    assert_eq!(summary.front_url, "http://front.acme-shop.localhost");
    assert_eq!(summary.email, "ops@acme.test");
    assert_eq!(summary.password.len(), 8);

    let project = cwd.path().join("acme-shop");
    let back = project.join("acme-shop-back");
    let front = project.join("acme-shop-front");

    let back_env = std::fs::read_to_string(back.join(ENV_EXAMPLE_FILE)).unwrap();
    assert!(back_env.contains("FRONT_END_URL=http://front.acme-shop.localhost"));
    assert!(back_env.contains("FRONT_END_FOLDER=acme-shop-front"));
    assert!(back.join(ENV_FILE).exists());

    let front_env = std::fs::read_to_string(front.join(ENV_EXAMPLE_FILE)).unwrap();
    assert!(front_env.contains("FILESYSTEM_ROOT=../acme-shop-back/storage/app"));

    let back_manifest = PackageManifest::load(&back.join(MANIFEST_FILE)).unwrap();
    assert_eq!(back_manifest.requirements.get("purposemedia/sites").unwrap(), "^2.1");
    assert_eq!(back_manifest.requirements.get("purposemedia/users").unwrap(), "^2.3");
    let front_manifest = PackageManifest::load(&front.join(MANIFEST_FILE)).unwrap();
    assert_eq!(front_manifest.requirements.get("purposemedia/front-pages").unwrap(), "^1.0");
    assert_eq!(front_manifest.asset_pin("jquery"), Some("^1.8.0"));

    // Back runs to completion before front starts
    let calls = runner.calls();
    let steps: Vec<_> = calls.iter().map(|c| c.step.as_str()).collect();
    assert_eq!(
        steps,
        vec![
            "install", "key:generate", "update", "rename", "publish",
            "install", "key:generate", "update", "rename", "publish",
        ]
    );
    assert!(calls[..5].iter().all(|c| c.cwd == back));
    assert!(calls[5..].iter().all(|c| c.cwd == front));
    assert_eq!(calls[0].command, "composer install --no-scripts");
    assert_eq!(calls[3].command, "php artisan ensphere:rename --vendor=acme-shop --module=back");
    assert_eq!(calls[8].command, "php artisan ensphere:rename --vendor=acme-shop --module=front");

    let seeded = seeder.requests();
    assert_eq!(seeded.len(), 1);
    assert_eq!(seeded[0].site.name, "Acme Shop");
    assert_eq!(seeded[0].site.front_end_url, "http://front.acme-shop.localhost");
    assert_eq!(seeded[0].site.front_end_folder, "acme-shop-front");
    assert_eq!(seeded[0].admin.password, summary.password);

    // One prompt round for both tiers
    assert_eq!(credentials.into_prompt().times_asked(), 1);
}

#[tokio::test]
async fn test_bundled_composer_is_preferred() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, true).await;
    let scratch = TempDir::new().unwrap();
    let template = write_template(scratch.path(), true);
    let cwd = TempDir::new().unwrap();

    let runner = Arc::new(RecordingRunner::new());
    let seeder = Arc::new(RecordingSeeder::new());
    let installer = installer(&server, &template, runner.clone(), seeder);

    installer
        .install(&request(cwd.path()), &mut credentials())
        .await
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls[0].step, "self-update");
    assert_eq!(calls[0].command, "php composer.phar self-update");
    assert_eq!(calls[1].command, "php composer.phar install --no-scripts");
}

#[tokio::test]
async fn test_back_failure_stops_before_front() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, true).await;
    let scratch = TempDir::new().unwrap();
    let template = write_template(scratch.path(), false);
    let cwd = TempDir::new().unwrap();

    let runner = Arc::new(RecordingRunner::failing_at("install"));
    let seeder = Arc::new(RecordingSeeder::new());
    let installer = installer(&server, &template, runner.clone(), seeder.clone());

    let err = installer
        .install(&request(cwd.path()), &mut credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, InstallerError::ExternalCommandFailed { ref step, .. } if step == "install"));

    let project = cwd.path().join("acme-shop");
    assert_eq!(runner.calls().len(), 1);
    assert!(project.join("acme-shop-back").exists());
    assert!(!project.join("acme-shop-front").exists());
    assert!(seeder.requests().is_empty());
}

#[tokio::test]
async fn test_missing_module_fails_before_any_command() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, false).await;
    let scratch = TempDir::new().unwrap();
    let template = write_template(scratch.path(), false);
    let cwd = TempDir::new().unwrap();

    let runner = Arc::new(RecordingRunner::new());
    let seeder = Arc::new(RecordingSeeder::new());
    let installer = installer(&server, &template, runner.clone(), seeder);
    let mut credentials = credentials();

    let err = installer
        .install(&request(cwd.path()), &mut credentials)
        .await
        .unwrap_err();
    match err {
        InstallerError::MissingModuleVersion { module, position } => {
            assert_eq!(module, "purposemedia/users");
            assert_eq!(position, "back");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(runner.calls().is_empty());
    assert!(!cwd.path().join("acme-shop").exists());
    assert_eq!(credentials.into_prompt().times_asked(), 0);
}

#[tokio::test]
async fn test_existing_project_is_rejected_before_catalog() {
    let server = MockServer::start_async().await;
    let (index, _list) = mock_catalog(&server, true).await;
    let scratch = TempDir::new().unwrap();
    let template = write_template(scratch.path(), false);
    let cwd = TempDir::new().unwrap();
    std::fs::create_dir_all(cwd.path().join("acme-shop")).unwrap();

    let runner = Arc::new(RecordingRunner::new());
    let installer = installer(&server, &template, runner, Arc::new(RecordingSeeder::new()));

    let err = installer
        .install(&request(cwd.path()), &mut credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, InstallerError::PreconditionFailed { .. }));
    index.assert_hits_async(0).await;
}

/// Runner that stands in for `composer create-project` by writing a skeleton
struct SkeletonRunner {
    inner: RecordingRunner,
}

#[async_trait]
impl CommandRunner for SkeletonRunner {
    async fn run(&self, step: &str, command: &str, cwd: &Path) -> ensphere_core::Result<()> {
        if step == "create-project" {
            let folder = command.rsplit(' ').next().unwrap_or_default();
            let dir = cwd.join(folder);
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join(MANIFEST_FILE), SKELETON)?;
        }
        self.inner.run(step, command, cwd).await
    }
}

#[tokio::test]
async fn test_admin_module_sandbox() {
    let cwd = TempDir::new().unwrap();
    let runner = Arc::new(SkeletonRunner {
        inner: RecordingRunner::new(),
    });
    let builder = SandboxBuilder::new(TestConfig, runner.clone(), host());
    let mut credentials = CredentialStore::new(
        FixedPrompt::new(OperatorDetails {
            email: None,
            ..operator()
        }),
        CredentialRequest {
            defaults: CredentialDefaults::sandbox(),
            ask_email: false,
        },
    );

    let summary = builder
        .create(
            &SandboxRequest {
                raw_name: "Contact Form".to_string(),
                position: Position::Back,
                cwd: cwd.path().to_path_buf(),
            },
            &mut credentials,
        )
        .await
        .unwrap();

    let dir = cwd.path().join("_admin-contact-form");
    assert_eq!(summary.directory, dir);

    let manifest = PackageManifest::load(&dir.join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.requirements.get("purposemedia/users").unwrap(), "*");

    let env = std::fs::read_to_string(dir.join(ENV_FILE)).unwrap();
    assert!(env.contains("APP_URL=http://localhost:8000"));
    assert!(env.contains("FRONT_END_FOLDER=_admin-contact-form"));

    let calls = runner.inner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].command,
        "composer create-project ensphere/ensphere:dev-master _admin-contact-form"
    );
    assert_eq!(calls[0].cwd, cwd.path());
    assert_eq!(calls[1].command, "composer update");
    assert_eq!(calls[1].cwd, dir);
}

#[tokio::test]
async fn test_existing_sandbox_is_rejected() {
    let cwd = TempDir::new().unwrap();
    std::fs::create_dir_all(cwd.path().join("_front-contact-form")).unwrap();

    let runner = Arc::new(RecordingRunner::new());
    let builder = SandboxBuilder::new(TestConfig, runner.clone(), host());
    let err = builder
        .create(
            &SandboxRequest {
                raw_name: "contact form".to_string(),
                position: Position::Front,
                cwd: cwd.path().to_path_buf(),
            },
            &mut credentials(),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("This module already exists."));
    assert!(runner.calls().is_empty());
}
