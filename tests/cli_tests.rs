//! CLI integration tests for react-agent
//!
//! Tests the command-line interface behavior including:
//! - Help and version output
//! - Tool listing
//! - Fail-fast configuration errors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get the react-agent command, isolated from the caller's environment
fn agent_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("react-agent").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("GOOGLE_API_KEY")
        .env_remove("REACT_AGENT_PROVIDER")
        .env_remove("REACT_AGENT_MODEL")
        .env_remove("REACT_AGENT_API_BASE")
        .env_remove("REACT_AGENT_MAX_ITERATIONS")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_output() {
    let dir = TempDir::new().unwrap();
    agent_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ReAct"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("tools"));
}

#[test]
fn test_version_output() {
    let dir = TempDir::new().unwrap();
    agent_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("react-agent"));
}

#[test]
fn test_ask_help() {
    let dir = TempDir::new().unwrap();
    agent_cmd(&dir)
        .args(["ask", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--stream"));
}

// ============================================================================
// Tool Listing
// ============================================================================

#[test]
fn test_tools_lists_builtin_tools_without_credentials() {
    let dir = TempDir::new().unwrap();
    agent_cmd(&dir)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("calculator"))
        .stdout(predicate::str::contains("search_web"))
        .stdout(predicate::str::contains("expression"))
        .stdout(predicate::str::contains("string (required)"));
}

#[test]
fn test_no_color_env_accepts_any_value() {
    let dir = TempDir::new().unwrap();
    for value in ["1", "true", "yes", ""] {
        agent_cmd(&dir)
            .env("NO_COLOR", value)
            .arg("tools")
            .assert()
            .success()
            .stdout(predicate::str::contains("calculator"));
    }

    agent_cmd(&dir)
        .env("NO_COLOR", "1")
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[").not());
}

// ============================================================================
// Configuration Errors
// ============================================================================

#[test]
fn test_missing_api_key_fails_fast() {
    let dir = TempDir::new().unwrap();
    agent_cmd(&dir)
        .args(["ask", "What is LangGraph?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("GOOGLE_API_KEY"));
}

#[test]
fn test_custom_api_key_env_from_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("react-agent.toml"),
        "[llm]\napi_key_env = \"MY_GEMINI_KEY\"\n",
    )
    .unwrap();

    agent_cmd(&dir)
        .env_remove("MY_GEMINI_KEY")
        .args(["ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MY_GEMINI_KEY"));
}

#[test]
fn test_zero_max_iterations_rejected() {
    let dir = TempDir::new().unwrap();
    agent_cmd(&dir)
        .env("GOOGLE_API_KEY", "test-key")
        .args(["--max-iterations", "0", "ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_iterations"));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    agent_cmd(&dir)
        .args(["--config", "absent.toml", "ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.toml"), "[agent\nmax_iterations = ").unwrap();

    agent_cmd(&dir)
        .args(["--config", "bad.toml", "ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_unknown_provider_rejected() {
    let dir = TempDir::new().unwrap();
    agent_cmd(&dir)
        .args(["--provider", "openai", "ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}

// ============================================================================
// Interactive Session
// ============================================================================

#[cfg(unix)]
#[test]
fn test_ctrl_c_at_chat_prompt_ends_session() {
    use std::io::{BufRead, BufReader};
    use std::process::{Command as StdCommand, Stdio};
    use std::time::{Duration, Instant};

    let dir = TempDir::new().unwrap();
    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("react-agent"))
        .current_dir(dir.path())
        .env_remove("REACT_AGENT_PROVIDER")
        .env_remove("REACT_AGENT_MODEL")
        .env_remove("REACT_AGENT_API_BASE")
        .env_remove("OLLAMA_URL")
        .env("NO_COLOR", "1")
        .args(["--provider", "ollama", "--export", "session.json", "chat"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut line = String::new();
    while !line.contains("[TIP]") {
        line.clear();
        assert!(stdout.read_line(&mut line).unwrap() > 0, "chat exited early");
    }
    std::thread::sleep(Duration::from_millis(300));

    let pid = child.id().to_string();
    let status = StdCommand::new("kill").args(["-INT", &pid]).status().unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("chat did not exit after Ctrl-C");
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    assert!(exit.success(), "unexpected exit: {:?}", exit);
    assert!(dir.path().join("session.json").exists());
}
