//! Integration tests for the pgmig CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ENV_VARS: [(&str, &str); 5] = [
    ("POSTGRES_USER", "app"),
    ("POSTGRES_PASSWORD", "secret"),
    ("POSTGRES_HOST", "127.0.0.1"),
    // Nothing listens here, so any attempt to connect fails fast.
    ("POSTGRES_PORT", "1"),
    ("POSTGRES_DB", "appdb"),
];

/// Get the pgmig binary
#[allow(deprecated)]
fn pgmig_cmd() -> Command {
    Command::cargo_bin("pgmig").unwrap()
}

/// pgmig running in `dir` with a complete, isolated environment
fn pgmig_in(dir: &Path) -> Command {
    let mut cmd = pgmig_cmd();
    cmd.current_dir(dir).env_clear().envs(ENV_VARS);
    cmd
}

fn migration_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_help_command() {
    pgmig_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pgmig"))
        .stdout(predicate::str::contains("--cmd"))
        .stdout(predicate::str::contains("--seed-file"))
        .stdout(predicate::str::contains("--steps"));
}

#[test]
fn test_single_dash_help() {
    pgmig_cmd()
        .arg("-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--cmd"));
}

#[test]
fn test_each_missing_env_var_is_fatal() {
    let temp_dir = TempDir::new().unwrap();

    for (missing, _) in ENV_VARS {
        let mut cmd = pgmig_in(temp_dir.path());
        cmd.env_remove(missing)
            .args(["-cmd", "create", "-name", "widgets"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains(missing));
    }

    // Nothing was written along the way.
    assert!(!temp_dir.path().join("database").exists());
}

#[test]
fn test_empty_env_var_is_fatal() {
    let temp_dir = TempDir::new().unwrap();

    pgmig_in(temp_dir.path())
        .env("POSTGRES_PASSWORD", "")
        .args(["-cmd", "version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("POSTGRES_PASSWORD"));
}

#[test]
fn test_create_writes_template_pair() {
    let temp_dir = TempDir::new().unwrap();

    pgmig_in(temp_dir.path())
        .args(["-cmd", "create", "-name", "widgets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created migration files"));

    let migrations = temp_dir.path().join("database").join("migrations");
    let names = migration_files(&migrations);
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with("_widgets.down.sql"));
    assert!(names[1].ends_with("_widgets.up.sql"));

    let up = fs::read_to_string(migrations.join(&names[1])).unwrap();
    let down = fs::read_to_string(migrations.join(&names[0])).unwrap();
    assert!(up.starts_with("-- Write your UP migration here"));
    assert!(up.contains("-- CREATE TABLE example (id SERIAL PRIMARY KEY, name TEXT);"));
    assert!(down.starts_with("-- Write your DOWN migration here"));
    assert!(down.contains("-- DROP TABLE example;"));
}

#[test]
fn test_create_with_double_dash_flags() {
    let temp_dir = TempDir::new().unwrap();

    pgmig_in(temp_dir.path())
        .args(["--cmd", "create", "--name=gadgets"])
        .assert()
        .success();

    let names = migration_files(&temp_dir.path().join("database").join("migrations"));
    assert!(names.iter().all(|n| n.contains("_gadgets.")));
}

#[test]
fn test_create_requires_name() {
    let temp_dir = TempDir::new().unwrap();

    pgmig_in(temp_dir.path())
        .args(["-cmd", "create"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Missing migration name"));

    pgmig_in(temp_dir.path())
        .args(["-cmd", "create", "-name", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing migration name"));
}

#[test]
fn test_create_honors_project_config() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("pgmig.toml"),
        "[paths]\nmigrations = \"db/migrate\"\n",
    )
    .unwrap();

    pgmig_in(temp_dir.path())
        .args(["-cmd", "create", "-name", "widgets"])
        .assert()
        .success();

    assert_eq!(migration_files(&temp_dir.path().join("db").join("migrate")).len(), 2);
    assert!(!temp_dir.path().join("database").exists());
}

#[test]
fn test_malformed_project_config_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("pgmig.toml"), "[paths\n").unwrap();

    pgmig_in(temp_dir.path())
        .args(["-cmd", "create", "-name", "widgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_env_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let dotenv: String = ENV_VARS
        .iter()
        .map(|(k, v)| format!("{}={}\n", k, v))
        .collect();
    fs::write(temp_dir.path().join(".env"), dotenv).unwrap();

    pgmig_cmd()
        .current_dir(temp_dir.path())
        .env_clear()
        .args(["-cmd", "create", "-name", "from_dotenv"])
        .assert()
        .success();

    assert_eq!(
        migration_files(&temp_dir.path().join("database").join("migrations")).len(),
        2
    );
}

#[test]
fn test_unknown_command_is_rejected() {
    let temp_dir = TempDir::new().unwrap();

    pgmig_in(temp_dir.path())
        .args(["-cmd", "sideways"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("sideways"));
}

#[test]
fn test_up_with_unknown_name_fails_before_connecting() {
    let temp_dir = TempDir::new().unwrap();
    let migrations = temp_dir.path().join("database").join("migrations");
    fs::create_dir_all(&migrations).unwrap();
    fs::write(migrations.join("20230101_000000_init.up.sql"), "SELECT 1;").unwrap();

    pgmig_in(temp_dir.path())
        .args(["-cmd", "up", "-name", "nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "no matching migration file found for 'nope'",
        ));
}

#[test]
fn test_missing_seed_file_fails_before_connecting() {
    let temp_dir = TempDir::new().unwrap();

    pgmig_in(temp_dir.path())
        .args(["-cmd", "seed", "-env", "staging"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("staging.sql"));

    pgmig_in(temp_dir.path())
        .args(["-cmd", "seed", "-seed-file", "fixtures/custom.sql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom.sql"));
}

#[test]
fn test_unreachable_database_is_fatal() {
    let temp_dir = TempDir::new().unwrap();

    pgmig_in(temp_dir.path())
        .args(["-cmd", "version"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to connect"));
}
