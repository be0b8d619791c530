//! End-to-end tests for the mgit binary

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

struct Fixture {
    repo: TempDir,
    home: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let repo = TempDir::new().unwrap();
        git2::Repository::init(repo.path()).unwrap();
        Self {
            repo,
            home: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.repo.path()
    }

    /// mgit in the repository with a clean environment and a throwaway HOME
    fn mgit(&self) -> Command {
        let mut cmd = Command::cargo_bin("mgit").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.home.path())
            .env_remove("MGIT_LOG")
            .env_remove("MGIT_USER_NAME")
            .env_remove("MGIT_USER_EMAIL")
            .env_remove("MGIT_USER_PUBKEY");
        cmd
    }

    /// mgit with an author configured through the environment
    fn mgit_as_alice(&self) -> Command {
        let mut cmd = self.mgit();
        cmd.env("MGIT_USER_NAME", "Alice")
            .env("MGIT_USER_EMAIL", "alice@example.com");
        cmd
    }

    fn stage(&self, name: &str, content: &str) {
        std::fs::write(self.path().join(name), content).unwrap();
        let repo = git2::Repository::open(self.path()).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    fn commit_json(&self, message: &str) -> Value {
        let out = self
            .mgit_as_alice()
            .args(["--json", "commit", "-m", message])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let response: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(response["ok"], true);
        response["data"].clone()
    }

    fn init_with_key(&self, key: &str) {
        self.mgit().arg("init").assert().success();
        self.mgit().args(["config", "user.pubkey", key]).assert().success();
    }
}

#[test]
fn test_init_creates_store_and_excludes_it() {
    let fx = Fixture::new();
    fx.mgit()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized identity store"));

    assert!(fx.path().join(".mgit/objects").is_dir());
    assert!(fx.path().join(".mgit/refs/heads").is_dir());
    let exclude = std::fs::read_to_string(fx.path().join(".git/info/exclude")).unwrap();
    assert!(exclude.lines().any(|l| l == "/.mgit/"));

    fx.mgit()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reinitialized"));
    let again = std::fs::read_to_string(fx.path().join(".git/info/exclude")).unwrap();
    assert_eq!(again.matches("/.mgit/").count(), 1);
}

#[test]
fn test_outside_repository_fails() {
    let dir = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    Command::cargo_bin("mgit")
        .unwrap()
        .current_dir(dir.path())
        .env("HOME", home.path())
        .arg("log")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Not a git repository"));
}

#[test]
fn test_commit_requires_store() {
    let fx = Fixture::new();
    fx.stage("a.txt", "one");
    fx.mgit_as_alice()
        .args(["commit", "-m", "first"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("mgit init"));
}

#[test]
fn test_commit_requires_author() {
    let fx = Fixture::new();
    fx.init_with_key("npub1alice");
    fx.stage("a.txt", "one");
    fx.mgit()
        .args(["commit", "-m", "first"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("user.name"));
}

#[test]
fn test_commit_log_verify_with_key() {
    let fx = Fixture::new();
    fx.init_with_key("npub1alice");

    fx.stage("a.txt", "one");
    let first = fx.commit_json("first commit");
    fx.stage("a.txt", "two");
    let second = fx.commit_json("second commit");

    let identity = second["identity_hash"].as_str().unwrap().to_string();
    let native = second["native_hash"].as_str().unwrap().to_string();
    assert_ne!(identity, native);
    assert_eq!(second["identity_key"], "npub1alice");

    fx.mgit()
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("commit {}", identity)))
        .stdout(predicate::str::contains(format!(
            "commit {}",
            first["identity_hash"].as_str().unwrap()
        )))
        .stdout(predicate::str::contains("Alice <alice@example.com> [npub1alice]"))
        .stdout(predicate::str::contains("    second commit"));

    fx.mgit()
        .args(["log", "-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first commit").not());

    fx.mgit()
        .arg("verify")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 valid, 0 issue(s)"));

    // identity prefixes resolve to the native commit
    fx.mgit()
        .args(["rev-parse", &identity[..10]])
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{}\n", native)));

    fx.mgit()
        .args(["show", &identity[..10]])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Native: {}", native)))
        .stdout(predicate::str::contains("Parents: "));
}

#[test]
fn test_commit_without_key_is_not_bound() {
    let fx = Fixture::new();
    fx.mgit().arg("init").assert().success();
    fx.stage("a.txt", "one");

    let data = fx.commit_json("plain");
    assert!(data.get("identity_hash").is_none());

    fx.mgit()
        .args(["mappings", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No mappings"));
    fx.mgit()
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("No identity commits yet"));
    fx.mgit()
        .args(["show", "HEAD"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Identity: not bound"));
}

#[test]
fn test_nothing_to_commit() {
    let fx = Fixture::new();
    fx.init_with_key("npub1alice");
    fx.mgit_as_alice()
        .args(["commit", "-m", "empty"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Nothing to commit"));
    fx.mgit_as_alice()
        .args(["commit", "-m", "empty", "--allow-empty"])
        .assert()
        .success();
}

#[test]
fn test_export_then_reconstruct_fresh_store() {
    let fx = Fixture::new();
    fx.init_with_key("npub1alice");
    fx.stage("a.txt", "one");
    fx.commit_json("first");
    fx.stage("b.txt", "two");
    let head = fx.commit_json("second");
    let branch = head["branch"].as_str().unwrap().to_string();

    let export = fx.home.path().join("mappings.json");
    fx.mgit()
        .args(["mappings", "export", "-o"])
        .arg(&export)
        .assert()
        .success();
    let payload: Value = serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(payload.as_array().unwrap().len(), 2);
    assert!(payload[0].get("gitHash").is_some());
    assert!(payload[0].get("mgitHash").is_some());

    // a clone only has the native history and the served mapping table
    std::fs::remove_dir_all(fx.path().join(".mgit")).unwrap();
    fx.mgit()
        .arg("reconstruct")
        .arg("--from")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 mapping(s)"))
        .stdout(predicate::str::contains("Reconstructed 2 identity commit(s)"))
        .stdout(predicate::str::contains(format!("HEAD is ref: refs/heads/{}", branch)));

    fx.mgit()
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "commit {}",
            head["identity_hash"].as_str().unwrap()
        )));
    fx.mgit().arg("verify").assert().success();

    // a second run writes nothing new
    fx.mgit()
        .args(["--json", "reconstruct"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"commits_written\": 0"));
}

#[test]
fn test_import_rejects_malformed_payload() {
    let fx = Fixture::new();
    fx.mgit().arg("init").assert().success();
    let bad = fx.home.path().join("bad.json");
    std::fs::write(&bad, r#"[{"gitHash": "zz", "mgitHash": "00", "pubkey": "npub1x"}]"#).unwrap();

    fx.mgit()
        .args(["mappings", "import"])
        .arg(&bad)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("entry 0"));
    assert!(!fx.path().join(".mgit/mappings/hash_mappings.json").exists());
}

#[test]
fn test_verify_reports_tampered_object() {
    let fx = Fixture::new();
    fx.init_with_key("npub1alice");
    fx.stage("a.txt", "one");
    let data = fx.commit_json("original message");
    let identity = data["identity_hash"].as_str().unwrap();

    let object = fx
        .path()
        .join(".mgit/objects")
        .join(&identity[..2])
        .join(&identity[2..]);
    let mut record: Value = serde_json::from_str(&std::fs::read_to_string(&object).unwrap()).unwrap();
    record["message"] = Value::String("forged message\n".to_string());
    std::fs::write(&object, serde_json::to_string(&record).unwrap()).unwrap();

    fx.mgit()
        .arg("verify")
        .assert()
        .code(6)
        .stdout(predicate::str::contains("[hash_mismatch]"))
        .stderr(predicate::str::contains("verification failed"));
}

#[test]
fn test_config_get_set_list() {
    let fx = Fixture::new();
    fx.mgit().arg("init").assert().success();

    fx.mgit()
        .args(["config", "--global", "user.name", "Global Alice"])
        .assert()
        .success();
    assert!(fx.home.path().join(".mgitconfig").exists());
    fx.mgit()
        .args(["config", "user.name", "Local Alice"])
        .assert()
        .success();

    fx.mgit()
        .args(["config", "user.name"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Local Alice\n"));
    fx.mgit()
        .args(["config", "--global", "user.name"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Global Alice\n"));
    fx.mgit()
        .args(["config", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user.name=Local Alice\t(local)"));

    fx.mgit()
        .args(["config", "user.email"])
        .assert()
        .code(3);
    fx.mgit()
        .args(["config", "core.editor", "vi"])
        .assert()
        .code(2);
    fx.mgit()
        .args(["config", "user.pubkey", "has space"])
        .assert()
        .code(2);
}

#[test]
fn test_json_error_envelope() {
    let fx = Fixture::new();
    fx.mgit().arg("init").assert().success();
    let out = fx
        .mgit()
        .args(["--json", "rev-parse", "no-such-branch"])
        .assert()
        .code(3)
        .get_output()
        .stderr
        .clone();
    let response: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"]["code"], "revision_not_found");
    assert!(response["error"]["details"]["suggestions"].is_array());
}

#[test]
fn test_forged_mapping_payload_is_refused() {
    let fx = Fixture::new();
    fx.init_with_key("npub1alice");
    fx.stage("a.txt", "one");
    let data = fx.commit_json("first");

    let export = fx.home.path().join("mappings.json");
    fx.mgit()
        .args(["mappings", "export", "-o"])
        .arg(&export)
        .assert()
        .success();
    let mut payload: Value = serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    payload[0]["mgitHash"] = Value::String("ee".repeat(20));
    let forged = fx.home.path().join("forged.json");
    std::fs::write(&forged, payload.to_string()).unwrap();

    std::fs::remove_dir_all(fx.path().join(".mgit")).unwrap();
    fx.mgit()
        .arg("reconstruct")
        .arg("--from")
        .arg(&forged)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("entry 0"));
    assert!(!fx.path().join(".mgit/mappings/hash_mappings.json").exists());

    fx.mgit()
        .arg("reconstruct")
        .arg("--from")
        .arg(&export)
        .assert()
        .success();
    fx.mgit()
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "commit {}",
            data["identity_hash"].as_str().unwrap()
        )));
}
