// Covers the cumulative-to-delta adapter and the claude backend end to end.

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use laws_agent::backends::claude::{delta_for, DeltaTracker, RuntimeMessage};
use laws_agent::config::{AgentConfig, ClineConfig};
use laws_agent::query::{BackendKind, QueryOptions};
use laws_agent::registry::BackendRegistry;
use laws_agent::stream;
use laws_agent::TextStream;
use tempfile::TempDir;

fn parse(line: &str) -> RuntimeMessage {
    serde_json::from_str(line).unwrap()
}

#[test]
fn tracker_emits_only_the_new_suffix() {
    let mut tracker = DeltaTracker::default();
    assert_eq!(tracker.push("Hello"), Some("Hello".to_string()));
    assert_eq!(tracker.push("Hello, world"), Some(", world".to_string()));
    assert_eq!(tracker.push("Hello, world"), None);
    assert_eq!(tracker.push("Hello"), None);
    assert_eq!(tracker.push(""), None);
}

#[test]
fn result_and_assistant_shapes_share_one_tracker() {
    let mut tracker = DeltaTracker::default();

    let assistant =
        parse(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hello"}]}}"#);
    assert_eq!(
        delta_for(&assistant, &mut tracker).unwrap(),
        Some("Hello".to_string())
    );

    let result = parse(r#"{"type":"result","result":"Hello, world"}"#);
    assert_eq!(
        delta_for(&result, &mut tracker).unwrap(),
        Some(", world".to_string())
    );

    // Re-delivery of the same full text emits nothing.
    let result = parse(r#"{"type":"result","result":"Hello, world"}"#);
    assert_eq!(delta_for(&result, &mut tracker).unwrap(), None);
}

#[test]
fn non_text_blocks_and_unknown_messages_are_ignored() {
    let mut tracker = DeltaTracker::default();

    let msg = parse(r#"{"type":"system","subtype":"init","session_id":"abc"}"#);
    assert_eq!(delta_for(&msg, &mut tracker).unwrap(), None);

    let msg = parse(
        r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read"},{"type":"text","text":"hi"}]}}"#,
    );
    assert_eq!(delta_for(&msg, &mut tracker).unwrap(), Some("hi".to_string()));
}

#[test]
fn error_result_fails_the_adapter() {
    let mut tracker = DeltaTracker::default();
    let msg = parse(r#"{"type":"result","is_error":true,"error":"quota exceeded"}"#);
    let err = delta_for(&msg, &mut tracker).unwrap_err();
    assert!(err.to_string().contains("quota exceeded"));
}

/// Write an executable shell script standing in for the claude binary.
fn fake_claude(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("fake-claude");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.display().to_string()
}

fn config_with(dir: &TempDir, bin: String) -> Arc<AgentConfig> {
    std::fs::write(dir.path().join("CLAUDE.md"), "# system prompt").unwrap();
    Arc::new(AgentConfig {
        workspace_dir: dir.path().to_path_buf(),
        system_prompt_path: dir.path().join("CLAUDE.md"),
        default_backend: BackendKind::Claude,
        claude_bin: bin,
        cline: ClineConfig {
            bin: "cline".to_string(),
            model: None,
            timeout_secs: 300,
            config_dir: None,
        },
    })
}

fn query(config: Arc<AgentConfig>, opts: QueryOptions) -> TextStream {
    let registry = BackendRegistry::new(config);
    stream::text_stream(&registry, opts)
}

async fn drain(mut stream: TextStream) -> (Vec<String>, Option<String>) {
    let mut deltas = Vec::new();
    while let Some(item) = stream.recv().await {
        match item {
            Ok(delta) => deltas.push(delta),
            Err(e) => return (deltas, Some(e.to_string())),
        }
    }
    (deltas, None)
}

#[tokio::test]
async fn cumulative_messages_become_suffix_deltas() {
    let dir = TempDir::new().unwrap();
    let bin = fake_claude(
        &dir,
        r#"echo '{"type":"assistant","message":{"content":[{"type":"text","text":"Hello"}]}}'
echo '{"type":"result","result":"Hello, world"}'"#,
    );

    let (deltas, err) = drain(query(config_with(&dir, bin), QueryOptions::new("q"))).await;
    assert_eq!(deltas, vec!["Hello", ", world"]);
    assert!(err.is_none());
}

#[tokio::test]
async fn runtime_error_result_fails_the_stream() {
    let dir = TempDir::new().unwrap();
    let bin = fake_claude(
        &dir,
        r#"echo '{"type":"result","is_error":true,"error":"overloaded"}'"#,
    );

    let (deltas, err) = drain(query(config_with(&dir, bin), QueryOptions::new("q"))).await;
    assert!(deltas.is_empty());
    assert!(err.expect("stream should fail").contains("overloaded"));
}

#[tokio::test]
async fn nonzero_exit_fails_the_stream() {
    let dir = TempDir::new().unwrap();
    let bin = fake_claude(&dir, "exit 2");

    let (_, err) = drain(query(config_with(&dir, bin), QueryOptions::new("q"))).await;
    assert!(err.expect("stream should fail").contains("exited with status"));
}

#[tokio::test]
async fn missing_system_prompt_fails_the_stream() {
    let dir = TempDir::new().unwrap();
    let bin = fake_claude(&dir, "exit 0");

    let mut config = config_with(&dir, bin);
    Arc::get_mut(&mut config).unwrap().system_prompt_path = dir.path().join("missing.md");

    let (_, err) = drain(query(config, QueryOptions::new("q"))).await;
    assert!(err
        .expect("stream should fail")
        .contains("Failed to read system prompt"));
}

#[tokio::test]
async fn cancellation_stops_delta_emission() {
    let dir = TempDir::new().unwrap();
    let bin = fake_claude(
        &dir,
        r#"echo '{"type":"assistant","message":{"content":[{"type":"text","text":"Hello"}]}}'
sleep 30
echo '{"type":"result","result":"Hello, world"}'"#,
    );

    let opts = QueryOptions::new("q");
    let cancel = opts.cancel.clone();
    let mut stream = query(config_with(&dir, bin), opts);

    assert_eq!(stream.recv().await.unwrap().unwrap(), "Hello");
    cancel.cancel();
    assert!(stream.recv().await.is_none());
}
