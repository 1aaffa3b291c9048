use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const S1: &str = r#"{"model":{"display_name":"Sonnet"},"cost":{"total_cost_usd":0.15},"context_window":{"used_percentage":30}}"#;

/// A sandboxed home: config, cache and agent-host state all live under a
/// temp dir so tests never touch the real user's files.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    fn cache_dir(&self) -> PathBuf {
        self.path().join("cache")
    }

    fn claude_home(&self) -> PathBuf {
        self.path().join("claude")
    }

    fn write_config(&self, contents: &str) {
        std::fs::write(self.config_path(), contents).unwrap();
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("claude-statusline").expect("binary exists");
        cmd.env("HOME", self.path())
            .env("CLAUDE_STATUSLINE_CONFIG", self.config_path())
            .env("CLAUDE_STATUSLINE_CACHE_DIR", self.cache_dir())
            .env("CLAUDE_CONFIG_DIR", self.claude_home())
            .env("COLUMNS", "120")
            .env_remove("NO_COLOR")
            .env_remove("CLAUDE_STATUSLINE_LOG")
            .env_remove("ANTHROPIC_API_KEY")
            .env_remove("AWS_ACCESS_KEY_ID")
            .env_remove("AWS_PROFILE")
            .env_remove("GOOGLE_APPLICATION_CREDENTIALS")
            .env_remove("CLOUDSDK_CORE_PROJECT");
        cmd
    }

    /// Render `stdin` with colour disabled.
    fn plain(&self, stdin: &str) -> String {
        let out = self
            .cmd()
            .env("NO_COLOR", "1")
            .write_stdin(stdin.to_string())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8(out).unwrap()
    }
}

// -----------------------------------------------------------------------
// Basic CLI
// -----------------------------------------------------------------------

#[test]
fn version_shows_semver() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn help_lists_flags() {
    Sandbox::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--init"))
        .stdout(predicate::str::contains("--check"));
}

#[test]
fn positional_args_rejected() {
    Sandbox::new()
        .cmd()
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// -----------------------------------------------------------------------
// Rendering
// -----------------------------------------------------------------------

#[test]
fn minimal_render_plain() {
    let sb = Sandbox::new();
    assert_eq!(sb.plain(S1), "Sonnet | Ctx: 30% ███░░░░░░░ | $0.15\n");
}

#[test]
fn minimal_render_colours() {
    Sandbox::new()
        .cmd()
        .write_stdin(S1)
        .assert()
        .success()
        .stdout(predicate::str::contains("\x1b[32mCtx: 30%"))
        .stdout(predicate::str::contains("\x1b[32m$0.15"));
}

#[test]
fn threshold_cascade_turns_red() {
    Sandbox::new()
        .cmd()
        .write_stdin(
            r#"{"model":{"display_name":"Sonnet"},"cost":{"total_cost_usd":1.20},"context_window":{"used_percentage":85}}"#,
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("\x1b[31mCtx: 85%"))
        .stdout(predicate::str::contains("\x1b[31m$1.20"));
}

#[test]
fn no_color_disables_escapes() {
    let sb = Sandbox::new();
    assert!(!sb.plain(S1).contains('\x1b'));
}

#[test]
fn split_line_right_aligns() {
    let sb = Sandbox::new();
    sb.write_config("[[lines]]\nleft = [{ name = \"model\" }]\nright = [{ name = \"cost\" }]\n");
    let out = sb
        .cmd()
        .env("NO_COLOR", "1")
        .env("COLUMNS", "40")
        .write_stdin(S1)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(out).unwrap();
    let line = out.trim_end_matches('\n');
    assert_eq!(line, format!("Sonnet{}$0.15", " ".repeat(29)));
    assert_eq!(line.chars().count(), 40);
}

#[test]
fn narrow_terminal_truncates() {
    let sb = Sandbox::new();
    let out = sb
        .cmd()
        .env("NO_COLOR", "1")
        .env("COLUMNS", "15")
        .write_stdin(S1)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out, "Sonnet | Ctx...\n");
}

#[test]
fn malformed_stdin_still_exits_zero() {
    let sb = Sandbox::new();
    for stdin in ["", "not json", "[1,2,3]", "{\"model\": 42}"] {
        sb.cmd().write_stdin(stdin).assert().success();
    }
}

#[test]
fn null_field_keeps_the_rest_of_the_session() {
    let sb = Sandbox::new();
    let out = sb.plain(
        r#"{"model":{"display_name":"Sonnet"},"cost":{"total_cost_usd":0.15},"context_window":{"used_percentage":null}}"#,
    );
    assert_eq!(out, "Sonnet | Ctx: 0% ░░░░░░░░░░ | $0.15\n");
}

#[test]
fn malformed_config_falls_back_to_default() {
    let sb = Sandbox::new();
    sb.write_config("[general\nseparator = ");
    assert_eq!(sb.plain(S1), "Sonnet | Ctx: 30% ███░░░░░░░ | $0.15\n");
}

#[test]
fn debug_reports_bad_config() {
    let sb = Sandbox::new();
    sb.write_config("[[lines]\n");
    sb.cmd()
        .arg("--debug")
        .write_stdin(S1)
        .assert()
        .success()
        .stderr(predicate::str::contains("[debug]"));
}

#[test]
fn custom_separator_and_format() {
    let sb = Sandbox::new();
    sb.write_config(
        r#"
[general]
separator = " :: "

[[lines]]
widgets = [
  { name = "model", format = "<{value}>" },
  { name = "context", extra = { show_bar = false } },
]
"#,
    );
    assert_eq!(sb.plain(S1), "<Sonnet> :: Ctx: 30%\n");
}

#[test]
fn history_written_with_sanitized_name() {
    let sb = Sandbox::new();
    sb.plain(r#"{"session_id":"abc/../x","context_window":{"used_percentage":12}}"#);
    let path = sb.cache_dir().join("history_abc____x.json");
    let saved = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json["entries"].as_array().unwrap().len(), 1);
    assert_eq!(json["entries"][0]["context_pct"], 12.0);
    assert!(json["block_start_time"].as_i64().unwrap() > 0);
}

#[test]
fn transcript_tools_on_second_line() {
    let sb = Sandbox::new();
    let transcript = sb.path().join("session.jsonl");
    let lines = [
        r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{}}]}}"#,
        r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1"}]}}"#,
        r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t2","name":"Write","input":{}}]}}"#,
        r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t3","name":"Read","input":{}}]}}"#,
    ];
    std::fs::write(&transcript, lines.join("\n") + "\n").unwrap();

    let stdin = serde_json::json!({
        "model": {"display_name": "Sonnet"},
        "transcript_path": transcript,
    })
    .to_string();
    let out = sb.plain(&stdin);
    let rows: Vec<&str> = out.trim_end().lines().collect();
    assert_eq!(rows.len(), 2, "{:?}", out);
    assert_eq!(rows[1], "◐ Read×2 ◐ Write");
}

#[test]
fn daily_cost_from_projects_dir() {
    let sb = Sandbox::new();
    let project = sb.claude_home().join("projects").join("demo");
    std::fs::create_dir_all(&project).unwrap();
    let now_ms = chrono::Utc::now().timestamp_millis();
    let lines = [
        format!(
            r#"{{"type":"assistant","timestamp":{},"costUsd":1.5,"message":{{"usage":{{"input_tokens":10,"output_tokens":10}}}}}}"#,
            now_ms
        ),
        format!(r#"{{"type":"user","timestamp":{},"message":{{"content":"hi"}}}}"#, now_ms),
    ];
    std::fs::write(project.join("s.jsonl"), lines.join("\n") + "\n").unwrap();
    sb.write_config("[[lines]]\nwidgets = [{ name = \"daily_cost\" }]\n");

    assert_eq!(sb.plain("{}"), "Today: $1.50\n");
    // Second run is served from the cost cache.
    assert!(sb.cache_dir().join("cost_cache.json").exists());
    assert_eq!(sb.plain("{}"), "Today: $1.50\n");
}

#[test]
fn plan_from_env_provider() {
    let sb = Sandbox::new();
    sb.write_config("[[lines]]\nwidgets = [{ name = \"plan\" }]\n");
    let out = sb
        .cmd()
        .env("NO_COLOR", "1")
        .env("ANTHROPIC_API_KEY", "sk-test")
        .write_stdin("{}")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8(out).unwrap(), "API\n");
}

// -----------------------------------------------------------------------
// Init / check / setup
// -----------------------------------------------------------------------

#[test]
fn init_writes_preset_and_refuses_overwrite() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["--init", "pro"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Created"));
    let written = std::fs::read_to_string(sb.config_path()).unwrap();
    assert!(written.contains("block_limit"));

    sb.cmd()
        .arg("--init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert_eq!(std::fs::read_to_string(sb.config_path()).unwrap(), written);

    sb.cmd().args(["--init", "minimal", "--force"]).assert().success();
    let replaced = std::fs::read_to_string(sb.config_path()).unwrap();
    assert!(!replaced.contains("block_limit"));
}

#[test]
fn init_unknown_preset_fails() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["--init", "fancy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown preset"));
    assert!(!sb.config_path().exists());
}

#[test]
fn check_reports_status() {
    let sb = Sandbox::new();
    sb.cmd().arg("--check").assert().failure();

    sb.cmd().arg("--init").assert().success();
    sb.cmd()
        .arg("--check")
        .assert()
        .success()
        .stderr(predicate::str::contains("config OK"));

    sb.write_config("[colors]\ngood = \"chartreuse\"\n\n[[lines]]\nwidgets = [{ name = \"model\" }]\n");
    sb.cmd()
        .arg("--check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("colors.good"));

    sb.write_config("[[lines]\n");
    sb.cmd().arg("--check").assert().failure();
}

#[test]
fn setup_prints_settings_snippet() {
    Sandbox::new()
        .cmd()
        .arg("--setup")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"statusLine\""))
        .stdout(predicate::str::contains("\"type\": \"command\""));
}
