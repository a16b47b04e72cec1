use figment::Jail;

use ragcmp_core::chat::{ChatMessage, ChatRole, ToolDefinition};
use ragcmp_core::config::{expand_path, resolve_with_base, Config};
use ragcmp_core::trace::Trace;
use ragcmp_core::types::ExpandedQuerySet;
use ragcmp_core::Error;

#[test]
fn defaults_apply_without_any_file() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        let cfg = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
        let s = cfg.settings().map_err(|e| e.to_string())?;
        assert_eq!(s.chunking.chunk_size, 800);
        assert_eq!(s.chunking.chunk_overlap, 150);
        assert_eq!(s.rerank.max_candidates, 20);
        assert_eq!(s.agent.serial_number, "AW3-2024-001255");
        assert!(!s.demo.pacing, "pacing is off unless configured");
        Ok(())
    });
}

#[test]
fn env_file_and_app_vars_override_base() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("config.toml", "[chunking]\nchunk_size = 500\nchunk_overlap = 50\n[llm]\nmodel = \"base\"\n")?;
        jail.create_file("config.test.toml", "[agent]\nsearch_k = 7\n")?;
        jail.set_env("APP_LLM__MODEL", "from-env");
        let cfg = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
        let s = cfg.settings().map_err(|e| e.to_string())?;
        assert_eq!(s.chunking.chunk_size, 500);
        assert_eq!(s.agent.search_k, 7);
        assert_eq!(s.llm.model, "from-env");
        let k: usize = cfg.get("agent.search_k").map_err(|e| e.to_string())?;
        assert_eq!(k, 7);
        Ok(())
    });
}

#[test]
fn overlap_not_smaller_than_size_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("config.toml", "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n")?;
        assert!(Config::load_from(jail.directory()).is_err());
        Ok(())
    });
}

#[test]
fn resolve_with_base_keeps_absolute_paths() {
    let base = std::path::Path::new("/srv/app");
    assert_eq!(resolve_with_base(base, "data/k.txt"), base.join("data/k.txt"));
    assert_eq!(resolve_with_base(base, "/etc/k.txt"), std::path::PathBuf::from("/etc/k.txt"));
    assert!(!expand_path("~/x").to_string_lossy().starts_with('~'));
}

#[test]
fn trace_step_serializes_with_fixed_field_names() {
    let mut trace = Trace::new();
    trace.push("initialize", "start");
    trace.push_with("load_knowledge", "loaded", serde_json::json!({"content_length": 42}));
    let steps = trace.into_steps();
    let first = serde_json::to_value(&steps[0]).unwrap();
    assert!(first.get("data").is_none(), "absent data is omitted");
    assert!(first["timestamp"].as_f64().unwrap() > 1_600_000_000.0);
    let second = serde_json::to_value(&steps[1]).unwrap();
    assert_eq!(second["step"], "load_knowledge");
    assert_eq!(second["data"]["content_length"], 42);
    assert!(steps[1].timestamp >= steps[0].timestamp);
}

#[test]
fn expanded_query_set_keeps_original_first() {
    let mut set = ExpandedQuerySet::new("q");
    set.push("q1");
    assert_eq!(set.original(), "q");
    assert_eq!(set.expansions(), &["q1".to_string()]);
    assert_eq!(set.len(), 2);
}

#[test]
fn chat_helpers_and_required_args() {
    let msg = ChatMessage::tool_result("call_1", "ok");
    assert_eq!(msg.role, ChatRole::Tool);
    assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    let def = ToolDefinition::new(
        "search_manual",
        "search",
        serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}, "required": ["query"]}),
    );
    assert_eq!(def.required_args(), vec!["query"]);
}

#[test]
fn configuration_errors_are_classified() {
    assert!(Error::UnknownMode("x".into()).is_configuration());
    assert!(!Error::model(anyhow::anyhow!("boom")).is_configuration());
    assert!(Error::model(anyhow::anyhow!("boom")).to_string().contains("boom"));
}
