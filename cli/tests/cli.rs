use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn appgen() -> Command {
    let mut cmd = Command::cargo_bin("appgen").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("APPGEN_PROTOCOL")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn tools_lists_the_manifest() {
    appgen()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("write_file(path, content)"))
        .stdout(predicate::str::contains("update_file(path, content)"))
        .stdout(predicate::str::contains("read_file(path)"))
        .stdout(predicate::str::contains("list_files()"))
        .stdout(predicate::str::contains("finish(summary)"));
}

#[test]
fn help_mentions_run_flags() {
    appgen()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-iterations"))
        .stdout(predicate::str::contains("--output-dir"))
        .stdout(predicate::str::contains("--keep-partial"));
}

#[test]
fn missing_goal_fails() {
    let dir = TempDir::new().unwrap();
    appgen()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Describe the application"));
}

#[test]
fn run_without_configuration_fails() {
    let dir = TempDir::new().unwrap();
    appgen()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .arg("a todo app")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration found"));
}

#[test]
fn batch_with_missing_goals_file_fails() {
    let dir = TempDir::new().unwrap();
    appgen()
        .current_dir(dir.path())
        .args(["batch", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read goals file"));
}

#[test]
fn config_with_unknown_protocol_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("appgen.json"),
        r#"{"protocol": "google_ai", "api_key": "k"}"#,
    )
    .unwrap();

    appgen()
        .current_dir(dir.path())
        .arg("a blog")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported protocol"));
}
