// Memoization and name-resolution behavior of the backend registry.

use std::sync::Arc;

use laws_agent::config::{AgentConfig, ClineConfig};
use laws_agent::query::BackendKind;
use laws_agent::registry::BackendRegistry;

fn test_config() -> Arc<AgentConfig> {
    Arc::new(AgentConfig {
        workspace_dir: "/tmp".into(),
        system_prompt_path: "/tmp/CLAUDE.md".into(),
        default_backend: BackendKind::Claude,
        claude_bin: "claude".to_string(),
        cline: ClineConfig {
            bin: "cline".to_string(),
            model: None,
            timeout_secs: 300,
            config_dir: None,
        },
    })
}

#[test]
fn resolve_memoizes_one_instance_per_kind() {
    let registry = BackendRegistry::new(test_config());

    let a = registry.resolve(BackendKind::Cline);
    let b = registry.resolve(BackendKind::Cline);
    assert!(std::ptr::eq(a, b));

    let c = registry.resolve(BackendKind::Claude);
    assert!(!std::ptr::eq(a, c));
    assert_eq!(a.name(), "cline");
    assert_eq!(c.name(), "claude");
}

#[test]
fn unknown_backend_names_fall_back_to_claude() {
    assert_eq!(BackendKind::from_name("cline"), BackendKind::Cline);
    assert_eq!(BackendKind::from_name("claude"), BackendKind::Claude);
    assert_eq!(BackendKind::from_name("gpt-9"), BackendKind::Claude);
    assert_eq!(BackendKind::from_name(""), BackendKind::Claude);
}

#[test]
fn kind_names_round_trip() {
    for kind in [BackendKind::Claude, BackendKind::Cline] {
        assert_eq!(BackendKind::from_name(kind.name()), kind);
    }
}
