use clap::Parser;
use std::fs;
use tempfile::TempDir;

use ragcmp_cli::cli::{Cli, Command};
use ragcmp_cli::{render_record, run_mode, AppContext};
use ragcmp_engine::{ExecutionMode, RunStatus};

#[test]
fn parses_modes_by_current_and_legacy_name() {
    let cli = Cli::try_parse_from(["ragcmp", "compare", "q", "--modes", "direct,rag_only,tool_invoking"]).unwrap();
    match cli.command {
        Command::Compare { modes, .. } => assert_eq!(
            modes,
            vec![ExecutionMode::Direct, ExecutionMode::RetrievalGrounded, ExecutionMode::ToolInvoking]
        ),
        other => panic!("unexpected command {other:?}"),
    }
    assert!(Cli::try_parse_from(["ragcmp", "ask", "q", "--mode", "nonsense"]).is_err());
}

#[test]
fn ask_defaults_to_retrieval_grounded() {
    let cli = Cli::try_parse_from(["ragcmp", "--config-dir", "/tmp/x", "ask", "E-404?"]).unwrap();
    assert_eq!(cli.config_dir.to_str(), Some("/tmp/x"));
    match cli.command {
        Command::Ask { mode, run, .. } => {
            assert_eq!(mode, ExecutionMode::RetrievalGrounded);
            assert!(!run.demo && !run.no_log);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

fn app_with_config(tmp: &TempDir, toml: &str) -> AppContext {
    fs::write(tmp.path().join("config.toml"), toml).unwrap();
    AppContext::load(tmp.path()).unwrap()
}

#[test]
fn paths_resolve_against_config_dir() {
    let tmp = TempDir::new().unwrap();
    let app = app_with_config(&tmp, "[knowledge]\npath = \"manual.txt\"\n[logs]\ndir = \"runs\"\n");
    assert_eq!(app.knowledge(None).describe(), tmp.path().join("manual.txt").display().to_string());
    assert_eq!(app.run_log().dir(), tmp.path().join("runs"));
}

#[tokio::test]
async fn scripted_direct_run_is_recorded() {
    let tmp = TempDir::new().unwrap();
    let app = app_with_config(&tmp, "[llm]\nprovider = \"scripted\"\n");
    let factory = app.factory(&[ExecutionMode::Direct], None).unwrap();
    let record = run_mode(&factory, ExecutionMode::Direct, "こんにちは", false).await;
    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(record.response, "[scripted] こんにちは");
    assert!(render_record(&record, true).contains("llm_invoke"));

    let log = app.run_log();
    log.write(&record).unwrap();
    assert_eq!(log.list().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_knowledge_becomes_an_error_record() {
    let tmp = TempDir::new().unwrap();
    let app = app_with_config(&tmp, "[llm]\nprovider = \"scripted\"\n[knowledge]\npath = \"absent.txt\"\n");
    let factory = app.factory(&[ExecutionMode::ContextStuffing], None).unwrap();
    let record = run_mode(&factory, ExecutionMode::ContextStuffing, "q", false).await;
    assert_eq!(record.status, RunStatus::Error);
    assert!(record.file_name().ends_with("_context_stuffing-error.jsonl"));
}
