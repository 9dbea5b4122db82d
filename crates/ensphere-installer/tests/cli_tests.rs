use assert_cmd::Command;
use tempfile::tempdir;

fn ensphere() -> Command {
    Command::cargo_bin("ensphere").unwrap()
}

#[test]
fn test_help_lists_commands() {
    let output = ensphere().arg("--help").assert().success().get_output().stdout.clone();
    let help = String::from_utf8_lossy(&output);
    assert!(help.contains("new"));
    assert!(help.contains("new:front-module"));
    assert!(help.contains("new:admin-module"));
    assert!(help.contains("--skip-version-check"));
}

#[test]
fn test_version_flag() {
    let output = ensphere().arg("--version").assert().success().get_output().stdout.clone();
    assert!(String::from_utf8_lossy(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_new_requires_a_name() {
    ensphere().arg("new").assert().failure();
}

#[test]
fn test_existing_project_exits_non_zero() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("acme-shop")).unwrap();

    ensphere()
        .current_dir(dir.path())
        .env("ENSPHERE_MODULES_URL", "http://127.0.0.1:9/")
        .env("ENSPHERE_ARCHIVE_URL", "http://127.0.0.1:9/archive.zip")
        .args(["new", "Acme Shop", "--skip-version-check"])
        .assert()
        .failure();

    // Nothing was created next to the existing project
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_existing_sandbox_exits_non_zero() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("_admin-contact-form")).unwrap();

    ensphere()
        .current_dir(dir.path())
        .args(["new:admin-module", "contact form", "--skip-version-check"])
        .assert()
        .failure();
}
