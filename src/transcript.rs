//! Bounded tail reader for the per-session JSONL transcript, and the fold
//! that turns the tail into tool / sub-agent / todo summaries.
//!
//! The transcript is append-only and can grow to hundreds of megabytes, so
//! the file is read backwards from EOF in growing chunks until enough lines
//! have been collected. Everything here is best-effort: I/O failures and
//! malformed lines are dropped, never surfaced.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

/// Default tail window, roughly 250 tool round-trips.
pub const DEFAULT_TAIL_LINES: usize = 500;

const BYTES_PER_LINE_ESTIMATE: u64 = 4 * 1024;
const MAX_CHUNK_BYTES: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Digest types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Running,
    Completed,
    Error,
}

/// Invocations of one tool name within the tail window.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    /// Id of the latest invocation; only its result may change `status`.
    pub id: String,
    pub name: String,
    pub status: ToolStatus,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Running,
    Completed,
}

/// A sub-agent launched through the `Task` tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: String,
    pub agent_type: String,
    pub status: AgentStatus,
    pub description: String,
    /// Unix milliseconds, 0 when the entry had no usable timestamp.
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn parse(s: &str) -> TodoStatus {
        match s {
            "in_progress" => TodoStatus::InProgress,
            "completed" => TodoStatus::Completed,
            _ => TodoStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Todo {
    pub id: String,
    pub subject: String,
    pub status: TodoStatus,
}

/// Summary of the transcript tail, injected into the tools/agents/todos
/// widgets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptDigest {
    /// First-seen order by name.
    pub tools: Vec<Tool>,
    /// First-seen order by invocation id.
    pub agents: Vec<Agent>,
    pub todos: Vec<Todo>,
}

impl TranscriptDigest {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.agents.is_empty() && self.todos.is_empty()
    }

    pub fn completed_todos(&self) -> usize {
        self.todos
            .iter()
            .filter(|t| t.status == TodoStatus::Completed)
            .count()
    }

    pub fn in_progress_todo(&self) -> Option<&Todo> {
        self.todos
            .iter()
            .find(|t| t.status == TodoStatus::InProgress)
    }
}

// ---------------------------------------------------------------------------
// Tail reader
// ---------------------------------------------------------------------------

/// Return the last `n` non-empty lines of `path` without reading the whole
/// file. `\r\n` endings are normalised.
pub fn tail_lines(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    if size == 0 || n == 0 {
        return Ok(Vec::new());
    }

    let mut chunk = (n as u64)
        .saturating_mul(BYTES_PER_LINE_ESTIMATE)
        .min(size)
        .max(1);
    let mut offset = size;
    let mut buf: Vec<u8> = Vec::new();

    loop {
        let read_len = chunk.min(offset);
        offset -= read_len;

        file.seek(SeekFrom::Start(offset))?;
        let mut piece = vec![0u8; read_len as usize];
        file.read_exact(&mut piece)?;
        piece.extend_from_slice(&buf);
        buf = piece;

        // n + 1 newlines guarantee n complete lines once the leading
        // fragment is discarded, even when the file ends with '\n'.
        let newlines = buf.iter().filter(|&&b| b == b'\n').count();
        if offset == 0 || newlines > n {
            break;
        }

        if chunk < MAX_CHUNK_BYTES {
            chunk = (chunk * 2).min(MAX_CHUNK_BYTES);
        }
    }

    let mut fragments = buf.split(|&b| b == b'\n');
    if offset > 0 {
        // Leading fragment may start mid-line.
        fragments.next();
    }

    let mut lines: Vec<String> = fragments
        .map(|raw| raw.strip_suffix(b"\r").unwrap_or(raw))
        .filter(|raw| !raw.iter().all(u8::is_ascii_whitespace))
        .map(|raw| String::from_utf8_lossy(raw).into_owned())
        .collect();

    if lines.len() > n {
        lines.drain(..lines.len() - n);
    }
    Ok(lines)
}

/// Read the tail of `path` and fold it. Any failure yields an empty digest.
pub fn read_digest(path: &Path, n: usize) -> TranscriptDigest {
    match tail_lines(path, n) {
        Ok(lines) => fold_lines(&lines),
        Err(e) => {
            tracing::debug!("transcript {} unreadable: {}", path.display(), e);
            TranscriptDigest::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Raw transcript shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    timestamp: Value,
    message: Option<RawMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMessage {
    /// Either a plain string or an array of content blocks.
    content: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    name: String,
    tool_use_id: String,
    is_error: Option<bool>,
    input: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TodoItem {
    id: Option<Value>,
    content: String,
    subject: String,
    status: String,
}

/// Content blocks of a message. The string form carries no blocks; an
/// array element that is not a block object is skipped on its own.
fn content_blocks(content: &Value) -> Vec<ContentBlock> {
    match content {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| ContentBlock::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Timestamps arrive as epoch milliseconds or RFC 3339 strings.
pub fn parse_timestamp_ms(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0),
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Fold
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Folder {
    digest: TranscriptDigest,
    tool_index: HashMap<String, usize>,
    agent_index: HashMap<String, usize>,
    id_to_name: HashMap<String, String>,
    skipped: usize,
}

/// Fold transcript lines, oldest first, into a digest.
pub fn fold_lines<S: AsRef<str>>(lines: &[S]) -> TranscriptDigest {
    let mut folder = Folder::default();
    for line in lines {
        match serde_json::from_str::<RawEntry>(line.as_ref()) {
            Ok(entry) => folder.apply(&entry),
            Err(_) => folder.skipped += 1,
        }
    }
    if folder.skipped > 0 {
        tracing::debug!("skipped {} malformed transcript lines", folder.skipped);
    }
    folder.digest
}

impl Folder {
    fn apply(&mut self, entry: &RawEntry) {
        let Some(message) = &entry.message else {
            return;
        };
        let timestamp = parse_timestamp_ms(&entry.timestamp);
        let blocks = content_blocks(&message.content);

        match entry.kind.as_str() {
            "assistant" => {
                for block in blocks.iter().filter(|b| b.kind == "tool_use") {
                    self.on_tool_use(block, timestamp);
                }
            }
            "user" => {
                for block in blocks.iter().filter(|b| b.kind == "tool_result") {
                    self.on_tool_result(block, timestamp);
                }
            }
            _ => {}
        }
    }

    fn on_tool_use(&mut self, block: &ContentBlock, timestamp: i64) {
        if block.id.is_empty() || block.name.is_empty() {
            return;
        }
        self.id_to_name
            .insert(block.id.clone(), block.name.clone());

        match self.tool_index.get(&block.name) {
            Some(&idx) => {
                let tool = &mut self.digest.tools[idx];
                tool.count += 1;
                tool.id = block.id.clone();
                tool.status = ToolStatus::Running;
            }
            None => {
                self.tool_index
                    .insert(block.name.clone(), self.digest.tools.len());
                self.digest.tools.push(Tool {
                    id: block.id.clone(),
                    name: block.name.clone(),
                    status: ToolStatus::Running,
                    count: 1,
                });
            }
        }

        match block.name.as_str() {
            "Task" => self.on_task(block, timestamp),
            "TodoWrite" => self.on_todo_write(&block.input),
            "TaskCreate" => self.on_task_create(&block.input),
            "TaskUpdate" => self.on_task_update(&block.input),
            _ => {}
        }
    }

    fn on_task(&mut self, block: &ContentBlock, timestamp: i64) {
        let agent_type = input_str(&block.input, "subagent_type");
        if agent_type.is_empty() || self.agent_index.contains_key(&block.id) {
            return;
        }
        self.agent_index
            .insert(block.id.clone(), self.digest.agents.len());
        self.digest.agents.push(Agent {
            id: block.id.clone(),
            agent_type: agent_type.to_string(),
            status: AgentStatus::Running,
            description: input_str(&block.input, "description").to_string(),
            start_time: timestamp,
            end_time: 0,
        });
    }

    /// The latest `TodoWrite` replaces the whole list.
    fn on_todo_write(&mut self, input: &Value) {
        let Some(items) = input.get("todos").and_then(Value::as_array) else {
            return;
        };
        let mut seen_in_progress = false;
        self.digest.todos = items
            .iter()
            .filter_map(|item| TodoItem::deserialize(item).ok())
            .enumerate()
            .map(|(i, item)| {
                let mut status = TodoStatus::parse(&item.status);
                if status == TodoStatus::InProgress {
                    if seen_in_progress {
                        status = TodoStatus::Pending;
                    }
                    seen_in_progress = true;
                }
                Todo {
                    id: item
                        .id
                        .as_ref()
                        .map(value_to_id)
                        .unwrap_or_else(|| (i + 1).to_string()),
                    subject: if item.content.is_empty() {
                        item.subject
                    } else {
                        item.content
                    },
                    status,
                }
            })
            .collect();
    }

    /// Task-list tools create items one at a time; ids are sequential.
    fn on_task_create(&mut self, input: &Value) {
        let subject = input_str(input, "subject");
        if subject.is_empty() {
            return;
        }
        let id = (self.digest.todos.len() + 1).to_string();
        self.digest.todos.push(Todo {
            id,
            subject: subject.to_string(),
            status: TodoStatus::Pending,
        });
    }

    fn on_task_update(&mut self, input: &Value) {
        let Some(id) = input.get("taskId").map(value_to_id) else {
            return;
        };
        let status = input
            .get("status")
            .and_then(Value::as_str)
            .map(TodoStatus::parse);

        if status == Some(TodoStatus::InProgress) {
            for todo in self.digest.todos.iter_mut() {
                if todo.status == TodoStatus::InProgress && todo.id != id {
                    todo.status = TodoStatus::Pending;
                }
            }
        }

        if let Some(todo) = self.digest.todos.iter_mut().find(|t| t.id == id) {
            if let Some(status) = status {
                todo.status = status;
            }
            let subject = input_str(input, "subject");
            if !subject.is_empty() {
                todo.subject = subject.to_string();
            }
        }
    }

    fn on_tool_result(&mut self, block: &ContentBlock, timestamp: i64) {
        let Some(name) = self.id_to_name.get(&block.tool_use_id) else {
            return;
        };

        if let Some(&idx) = self.tool_index.get(name) {
            let tool = &mut self.digest.tools[idx];
            // Results of superseded invocations are ignored.
            if tool.id == block.tool_use_id {
                tool.status = if block.is_error.unwrap_or(false) {
                    ToolStatus::Error
                } else {
                    ToolStatus::Completed
                };
            }
        }

        if let Some(&idx) = self.agent_index.get(&block.tool_use_id) {
            let agent = &mut self.digest.agents[idx];
            agent.status = AgentStatus::Completed;
            agent.end_time = timestamp;
        }
    }
}

fn input_str<'a>(input: &'a Value, key: &str) -> &'a str {
    input.get(key).and_then(Value::as_str).unwrap_or("")
}

fn value_to_id(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tool_use(id: &str, name: &str) -> String {
        serde_json::json!({
            "type": "assistant",
            "timestamp": "2025-06-01T10:00:00Z",
            "message": {"content": [{"type": "tool_use", "id": id, "name": name, "input": {}}]}
        })
        .to_string()
    }

    fn tool_result(id: &str, is_error: bool) -> String {
        serde_json::json!({
            "type": "user",
            "timestamp": "2025-06-01T10:00:05Z",
            "message": {"content": [{"type": "tool_result", "tool_use_id": id, "is_error": is_error}]}
        })
        .to_string()
    }

    fn task(id: &str, agent_type: &str, description: &str) -> String {
        serde_json::json!({
            "type": "assistant",
            "timestamp": 1_000,
            "message": {"content": [{
                "type": "tool_use", "id": id, "name": "Task",
                "input": {"subagent_type": agent_type, "description": description}
            }]}
        })
        .to_string()
    }

    fn write_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    // --- Tail reader ---

    #[test]
    fn test_tail_returns_last_n_lines() {
        let body: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        let f = write_file(&body);
        let lines = tail_lines(f.path(), 10).unwrap();
        let expected: Vec<String> = (90..100).map(|i| format!("line {}", i)).collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_tail_exact_for_every_n() {
        let body: String = (0..40).map(|i| format!("{{\"n\":{}}}\n", i)).collect();
        let f = write_file(&body);
        for n in 1..=40 {
            let lines = tail_lines(f.path(), n).unwrap();
            assert_eq!(lines.len(), n);
            assert_eq!(lines.last().unwrap(), "{\"n\":39}");
            assert_eq!(lines[0], format!("{{\"n\":{}}}", 40 - n));
        }
    }

    #[test]
    fn test_tail_more_than_available() {
        let f = write_file("a\nb\nc");
        assert_eq!(tail_lines(f.path(), 10).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tail_crlf_and_blank_lines() {
        let f = write_file("a\r\n\r\nb\r\n  \nc\r\n");
        assert_eq!(tail_lines(f.path(), 10).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tail_long_lines_cross_chunks() {
        // Lines much longer than the per-line estimate force several
        // backward reads with chunk doubling.
        let long = "x".repeat(20_000);
        let body: String = (0..6).map(|i| format!("{}{}\n", i, long)).collect();
        let f = write_file(&body);
        let lines = tail_lines(f.path(), 3).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('3'));
        assert!(lines[2].starts_with('5'));
        assert!(lines.iter().all(|l| l.len() == 20_001));
    }

    #[test]
    fn test_tail_empty_and_missing() {
        let f = write_file("");
        assert!(tail_lines(f.path(), 5).unwrap().is_empty());
        assert!(tail_lines(Path::new("/nonexistent/transcript.jsonl"), 5).is_err());
        assert!(read_digest(Path::new("/nonexistent/transcript.jsonl"), 5).is_empty());
    }

    // --- Fold ---

    #[test]
    fn test_fold_groups_by_name() {
        let lines = vec![
            tool_use("t1", "Read"),
            tool_result("t1", false),
            tool_use("t2", "Write"),
            tool_use("t3", "Read"),
        ];
        let digest = fold_lines(&lines);
        assert_eq!(
            digest.tools,
            vec![
                Tool {
                    id: "t3".into(),
                    name: "Read".into(),
                    status: ToolStatus::Running,
                    count: 2
                },
                Tool {
                    id: "t2".into(),
                    name: "Write".into(),
                    status: ToolStatus::Running,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_fold_stale_result_ignored() {
        let lines = vec![
            tool_use("t1", "Bash"),
            tool_use("t2", "Bash"),
            tool_result("t1", true),
        ];
        let digest = fold_lines(&lines);
        assert_eq!(digest.tools[0].status, ToolStatus::Running);
        assert_eq!(digest.tools[0].count, 2);
    }

    #[test]
    fn test_fold_error_result() {
        let lines = vec![tool_use("t1", "Bash"), tool_result("t1", true)];
        let digest = fold_lines(&lines);
        assert_eq!(digest.tools[0].status, ToolStatus::Error);
    }

    #[test]
    fn test_fold_agents() {
        let lines = vec![
            task("a1", "Explore", "find config"),
            task("a2", "", "no type"),
            task("a3", "Plan", "design"),
            tool_result("a1", false),
        ];
        let digest = fold_lines(&lines);
        assert_eq!(digest.agents.len(), 2);
        assert_eq!(digest.agents[0].id, "a1");
        assert_eq!(digest.agents[0].agent_type, "Explore");
        assert_eq!(digest.agents[0].description, "find config");
        assert_eq!(digest.agents[0].status, AgentStatus::Completed);
        assert_eq!(digest.agents[0].start_time, 1_000);
        assert_eq!(
            digest.agents[0].end_time,
            parse_timestamp_ms(&Value::String("2025-06-01T10:00:05Z".into()))
        );
        assert_eq!(digest.agents[1].status, AgentStatus::Running);
    }

    #[test]
    fn test_fold_todo_write_latest_wins() {
        let first = serde_json::json!({
            "type": "assistant",
            "message": {"content": [{"type": "tool_use", "id": "w1", "name": "TodoWrite",
                "input": {"todos": [{"content": "old", "status": "pending"}]}}]}
        })
        .to_string();
        let second = serde_json::json!({
            "type": "assistant",
            "message": {"content": [{"type": "tool_use", "id": "w2", "name": "TodoWrite",
                "input": {"todos": [
                    {"content": "write tests", "status": "completed"},
                    {"content": "fix bug", "status": "in_progress"},
                    {"content": "also active", "status": "in_progress"},
                    {"content": "ship", "status": "pending"}
                ]}}]}
        })
        .to_string();
        let digest = fold_lines(&[first, second]);
        assert_eq!(digest.todos.len(), 4);
        assert_eq!(digest.completed_todos(), 1);
        assert_eq!(digest.in_progress_todo().unwrap().subject, "fix bug");
        assert_eq!(digest.todos[2].status, TodoStatus::Pending);
        assert_eq!(digest.todos[0].id, "1");
    }

    #[test]
    fn test_fold_task_create_and_update() {
        let create = |id: &str, subject: &str| {
            serde_json::json!({
                "type": "assistant",
                "message": {"content": [{"type": "tool_use", "id": id, "name": "TaskCreate",
                    "input": {"subject": subject}}]}
            })
            .to_string()
        };
        let update = serde_json::json!({
            "type": "assistant",
            "message": {"content": [{"type": "tool_use", "id": "u1", "name": "TaskUpdate",
                "input": {"taskId": "2", "status": "in_progress"}}]}
        })
        .to_string();
        let digest = fold_lines(&[create("c1", "one"), create("c2", "two"), update]);
        assert_eq!(digest.todos.len(), 2);
        assert_eq!(digest.todos[1].status, TodoStatus::InProgress);
        assert_eq!(digest.todos[0].status, TodoStatus::Pending);
    }

    #[test]
    fn test_fold_string_content_and_garbage() {
        let lines = vec![
            r#"{"type":"user","message":{"content":"plain text prompt"}}"#.to_string(),
            "not json at all".to_string(),
            r#"{"type":"assistant","message":{"content":[42, {"type":"tool_use","id":"x","name":"Grep"}]}}"#.to_string(),
            r#"{"type":"summary"}"#.to_string(),
        ];
        let digest = fold_lines(&lines);
        assert_eq!(digest.tools.len(), 1);
        assert_eq!(digest.tools[0].name, "Grep");
    }

    #[test]
    fn test_fold_result_without_use_ignored() {
        let digest = fold_lines(&[tool_result("ghost", false)]);
        assert!(digest.is_empty());
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp_ms(&serde_json::json!(1234)), 1234);
        assert_eq!(
            parse_timestamp_ms(&serde_json::json!("1970-01-01T00:00:01.500Z")),
            1500
        );
        assert_eq!(parse_timestamp_ms(&serde_json::json!("yesterday")), 0);
        assert_eq!(parse_timestamp_ms(&Value::Null), 0);
    }

    #[test]
    fn test_read_digest_from_file() {
        let body = [
            tool_use("t1", "Read"),
            tool_result("t1", false),
            tool_use("t2", "Write"),
            tool_use("t3", "Read"),
        ]
        .join("\n");
        let f = write_file(&body);
        let digest = read_digest(f.path(), DEFAULT_TAIL_LINES);
        assert_eq!(digest.tools.len(), 2);
        assert_eq!(digest.tools[0].name, "Read");
        assert_eq!(digest.tools[0].count, 2);
        assert_eq!(digest.tools[1].name, "Write");
    }
}
