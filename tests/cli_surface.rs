use assert_cmd::Command;
use predicates::prelude::*;

fn console() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("risk-console"));
    cmd.env_remove("RISK_CONSOLE_API_URL")
        .env_remove("RISK_CONSOLE_API_KEY")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn help_lists_subcommands() {
    console()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("--api-url"));
}

#[test]
fn completions_generate_for_bash() {
    console()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("risk-console"));
}

#[test]
fn man_page_renders() {
    console()
        .arg("man")
        .assert()
        .success()
        .stdout(predicate::str::contains(".TH"));
}

#[test]
fn unknown_scenario_lists_valid_ids() {
    console()
        .args(["analyze", "--scenario", "hire_everyone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("add_resource"));
}

#[test]
fn health_fails_against_unreachable_backend() {
    console()
        .args(["--api-url", "http://127.0.0.1:9", "health"])
        .env("RISK_CONSOLE_HEALTH_ATTEMPTS", "1")
        .env("RISK_CONSOLE_TIMEOUT_MS", "500")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not reachable"));
}

#[test]
fn headless_tui_renders_one_frame() {
    console()
        .args(["--api-url", "http://127.0.0.1:9", "tui", "--once"])
        .env("TUI_HEADLESS", "1")
        .env("RISK_CONSOLE_HEALTH_ATTEMPTS", "1")
        .env("RISK_CONSOLE_TIMEOUT_MS", "500")
        .assert()
        .success()
        .stdout(predicate::str::contains("disconnected"))
        .stdout(predicate::str::contains("run disabled"));
}
