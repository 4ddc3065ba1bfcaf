//! CLI integration tests for docvault admin commands.
//!
//! Each test uses an isolated temp directory for the config and database,
//! ensuring tests can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use docvault::auth::PasswordHasher;
use docvault::config::ServerConfig;
use docvault::service::accounts::{self, Registration};
use docvault::store::SqliteStore;
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("docvault").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("DOCVAULT_DATA_DIR");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }

    fn info_json(&self) -> Value {
        let output = self
            .cmd()
            .args([
                "admin",
                "info",
                "--data-dir",
                &self.data_dir_str(),
                "--json",
            ])
            .output()
            .expect("failed to run command");

        assert!(output.status.success(), "info failed: {output:?}");
        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }
}

#[test]
fn test_init_writes_config_and_database() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Initialized docvault"));

    ctx.temp_dir
        .child("docvault.toml")
        .assert(predicate::str::contains("max_upload_bytes = 104857600"));
    ctx.temp_dir
        .child("docvault.toml")
        .assert(predicate::str::contains("backend = \"local\""));
    ctx.temp_dir.child("docvault.db").assert(predicate::path::exists());
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("Already initialized"));
}

#[test]
fn test_info_reports_counts() {
    let ctx = TestContext::new();
    ctx.init().success();

    let info = ctx.info_json();
    assert_eq!(info["storage"], "local");
    assert_eq!(info["max_upload_bytes"], 104_857_600);
    assert_eq!(info["max_files_per_upload"], 20);
    assert_eq!(info["users"], 0);
    assert_eq!(info["documents"], 0);

    let config = ServerConfig::load(ctx.data_dir()).expect("load config");
    let store = SqliteStore::new(config.db_path()).expect("open database");
    accounts::register(
        &store,
        &PasswordHasher::new(),
        &Registration {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
            ..Registration::default()
        },
    )
    .expect("register user");

    assert_eq!(ctx.info_json()["users"], 1);
}

#[test]
fn test_info_human_readable() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "info", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Storage backend:  local"))
        .stdout(predicate::str::contains("100.00 MB per file"));
}

#[test]
fn test_info_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["admin", "info", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("docvault admin init"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_serve_rejects_incomplete_cloudinary_config() {
    let ctx = TestContext::new();
    ctx.temp_dir
        .child("docvault.toml")
        .write_str("[storage]\nbackend = \"cloudinary\"\ncloud_name = \"demo\"\napi_key = \"k\"\n")
        .expect("write config");

    ctx.cmd()
        .env_remove("CLOUDINARY_API_SECRET")
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_secret"));
}
