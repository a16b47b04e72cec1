use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ragcmp_core::chat::{ChatRole, ToolCall};
use ragcmp_core::config::Settings;
use ragcmp_core::traits::{CrossEncoder, Embedder};
use ragcmp_core::types::Document;
use ragcmp_core::Error;
use ragcmp_embed::{HashingEmbedder, OverlapScorer};
use ragcmp_engine::pacing::Pacer;
use ragcmp_engine::{Capabilities, ExecutionMode, KnowledgeSource, StrategyFactory};
use ragcmp_llm::ScriptedModel;

const MANUAL: &str = "## 概要\nAuto-Welder V3 は自動溶接ロボットです。\n\n## エラー\nE-404: ワイヤー送給センサーの異常です。\n\n## 保証\n保証期間は購入日から一年間です。";

fn knowledge() -> KnowledgeSource {
    KnowledgeSource::inline(Document::new("manual.txt", MANUAL))
}

fn small_chunk_settings() -> Settings {
    let mut s = Settings::default();
    s.chunking.chunk_size = 50;
    s.chunking.chunk_overlap = 0;
    s.agent.chunk_size = 50;
    s.agent.chunk_overlap = 0;
    s
}

fn factory(model: Arc<ScriptedModel>, settings: Settings) -> StrategyFactory {
    factory_with_embedder(model, settings, Arc::new(HashingEmbedder::new(256)))
}

fn factory_with_embedder(model: Arc<ScriptedModel>, settings: Settings, embedder: Arc<dyn Embedder>) -> StrategyFactory {
    let caps = Capabilities {
        llm: model,
        embedder: Some(embedder),
        cross_encoder: Some(Arc::new(OverlapScorer::new()) as Arc<dyn CrossEncoder>),
    };
    StrategyFactory::new(caps, Some(knowledge()), settings)
}

/// Fails the first `failures` batches, then embeds like the hashing embedder.
struct FlakyEmbedder {
    failures: AtomicUsize,
    inner: HashingEmbedder,
}

impl FlakyEmbedder {
    fn new(failures: usize) -> Self {
        Self { failures: AtomicUsize::new(failures), inner: HashingEmbedder::new(256) }
    }
}

impl Embedder for FlakyEmbedder {
    fn model_id(&self) -> &str { "flaky" }
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("embedding backend crashed");
        }
        self.inner.embed_batch(texts)
    }
}

fn step_names(out: &ragcmp_engine::StrategyOutput) -> Vec<&str> {
    out.intermediate_steps.iter().map(|s| s.step.as_str()).collect()
}

#[tokio::test]
async fn direct_mode_without_knowledge() {
    let model = Arc::new(ScriptedModel::new());
    model.push_text("E-404 はセンサー異常です。");
    let factory = StrategyFactory::new(Capabilities::llm_only(model.clone()), None, Settings::default());
    let strategy = factory.create(ExecutionMode::Direct).unwrap();
    let out = strategy.process("エラーコードE-404の対処法は？", false).await.unwrap();
    assert_eq!(out.response, "E-404 はセンサー異常です。");
    assert_eq!(step_names(&out), vec!["initialize", "llm_invoke", "complete"]);
    assert_eq!(model.calls()[0][0].content, "エラーコードE-404の対処法は？");
}

#[tokio::test]
async fn stuffing_puts_whole_document_in_prompt() {
    let model = Arc::new(ScriptedModel::new());
    let factory = factory(model.clone(), Settings::default());
    let out = factory.create(ExecutionMode::ContextStuffing).unwrap().process("保証期間は？", false).await.unwrap();
    assert_eq!(step_names(&out), vec!["initialize", "load_knowledge", "create_prompt", "llm_invoke", "complete"]);
    let prompt = out.actual_prompt.unwrap();
    assert!(prompt.contains(MANUAL));
    assert!(prompt.contains("=== 質問 ===\n保証期間は？"));
    let load = &out.intermediate_steps[1];
    assert_eq!(load.data.as_ref().unwrap()["content_length"], MANUAL.chars().count());
}

#[tokio::test]
async fn retrieval_includes_the_error_code_chunk() {
    let model = Arc::new(ScriptedModel::new());
    let mut settings = small_chunk_settings();
    settings.expansion.enabled = false;
    settings.rerank.enabled = false;
    settings.retrieval.vector_k = 1;
    let factory = factory(model.clone(), settings);
    let strategy = factory.create(ExecutionMode::RetrievalGrounded).unwrap();

    let out = strategy.process("エラーコードE-404の対処法は？", false).await.unwrap();
    assert_eq!(
        step_names(&out),
        vec![
            "initialize",
            "split_documents",
            "create_vectorstore",
            "query_expansion_skipped",
            "hybrid_retrieval",
            "reranking_skipped",
            "context_reorder",
            "generate",
            "complete",
        ]
    );
    assert_eq!(out.intermediate_steps[1].data.as_ref().unwrap()["chunk_count"], 3);
    assert!(out.actual_prompt.unwrap().contains("E-404: ワイヤー送給センサーの異常です。"));
    let stats = out.retrieval_stats.unwrap();
    assert!(stats.hybrid_applied && !stats.reranking_applied);

    let again = strategy.process("保証は？", false).await.unwrap();
    assert_eq!(step_names(&again)[1], "vectorstore_cached");
}

#[tokio::test]
async fn retrieval_with_expansion_and_reranking() {
    let model = Arc::new(ScriptedModel::new());
    model.push_text("1. E-404 の原因\n2. ワイヤー送給センサー 異常");
    model.push_text("センサーを確認してください。");
    let mut settings = small_chunk_settings();
    settings.rerank.top_k = 1;
    let factory = factory(model.clone(), settings);
    let out = factory.create(ExecutionMode::RetrievalGrounded).unwrap().process("E-404 の対処法", false).await.unwrap();

    let names = step_names(&out);
    assert!(names.contains(&"query_expansion"));
    assert!(names.contains(&"reranking"));
    assert_eq!(out.response, "センサーを確認してください。");
    let stats = out.retrieval_stats.unwrap();
    assert_eq!(stats.expanded_queries.len(), 3);
    assert_eq!(stats.final_chunks, 1);
    assert!(stats.reranking_applied);
}

#[tokio::test]
async fn vector_only_retrieval_traces_skipped_keyword_search() {
    let model = Arc::new(ScriptedModel::new());
    let mut settings = small_chunk_settings();
    settings.retrieval.hybrid = false;
    settings.expansion.enabled = false;
    settings.reorder.enabled = false;
    let out = factory(model, settings)
        .create(ExecutionMode::RetrievalGrounded)
        .unwrap()
        .process("保証", false)
        .await
        .unwrap();
    let names = step_names(&out);
    assert!(names.contains(&"keyword_search_skipped"));
    assert!(names.contains(&"vector_retrieval"));
    assert!(names.contains(&"context_reorder_skipped"));
}

#[tokio::test]
async fn tool_invoking_answers_from_second_call() {
    let call = ToolCall::new("call_1", "search_manual", json!({"query": "E-404"}));
    let model = Arc::new(ScriptedModel::always_calling(call));
    model.push_text("ケーブルを再接続してください。");
    let factory = factory(model.clone(), Settings::default());
    let out = factory.create(ExecutionMode::ToolInvoking).unwrap().process("E-404 の対処法は？", false).await.unwrap();

    assert_eq!(
        step_names(&out),
        vec!["initialize", "llm_tool_decision", "tool_execution", "tool_result", "final_answer", "complete"]
    );
    assert_eq!(out.response, "ケーブルを再接続してください。");
    assert_ne!(out.response, "[scripted] tool request");
    let second = &model.calls()[1][0].content;
    assert!(second.contains("E-404: ワイヤー送給センサーの異常です。"));
    assert!(second.starts_with("以下のツール実行結果を基に"));
}

#[tokio::test]
async fn tool_invoking_executes_only_the_first_call() {
    let model = Arc::new(ScriptedModel::new());
    model.push(ragcmp_core::chat::ModelTurn {
        content: String::new(),
        tool_calls: vec![
            ToolCall::new("a", "search_manual", json!({"query": "保証"})),
            ToolCall::new("b", "search_manual", json!({"query": "概要"})),
        ],
    });
    let out = factory(model, Settings::default())
        .create(ExecutionMode::ToolInvoking)
        .unwrap()
        .process("保証は？", false)
        .await
        .unwrap();
    let exec = out.intermediate_steps.iter().find(|s| s.step == "tool_execution").unwrap();
    assert_eq!(exec.data.as_ref().unwrap()["ignored_tool_calls"], 1);
    assert_eq!(exec.data.as_ref().unwrap()["tool_args"]["query"], "保証");
}

#[tokio::test]
async fn tool_invoking_direct_and_unknown_tool_paths() {
    let model = Arc::new(ScriptedModel::new());
    model.push_text("ツールは不要です。");
    model.push_tool_call(ToolCall::new("x", "format_disk", json!({})));
    let factory = factory(model, Settings::default());
    let strategy = factory.create(ExecutionMode::ToolInvoking).unwrap();

    let direct = strategy.process("こんにちは", false).await.unwrap();
    assert_eq!(step_names(&direct), vec!["initialize", "llm_tool_decision", "direct_answer", "complete"]);
    assert_eq!(direct.response, "ツールは不要です。");

    let unknown = strategy.process("消して", false).await.unwrap();
    assert_eq!(step_names(&unknown), vec!["initialize", "llm_tool_decision", "tool_error", "complete"]);
    assert!(unknown.response.contains("format_disk"));
}

#[tokio::test]
async fn agent_runs_tools_until_final_answer() {
    let model = Arc::new(ScriptedModel::new());
    model.push_tool_call(ToolCall::new("c1", "get_robot_serial_number", json!({})));
    model.push_tool_call(ToolCall::new("c2", "search_knowledge_base", json!({"query": "E-404"})));
    model.push_text("シリアル番号は AW3-2024-001255 です。");
    let factory = factory(model.clone(), small_chunk_settings());
    let strategy = factory.create(ExecutionMode::RetrievalAgent).unwrap();
    let out = strategy.process("シリアル番号と E-404 について", false).await.unwrap();

    assert_eq!(
        step_names(&out),
        vec!["initialize", "setup_rag", "setup_agent", "agent_execution", "agent_tool_call", "agent_tool_call", "complete"]
    );
    assert_eq!(out.response, "シリアル番号は AW3-2024-001255 です。");
    let calls = model.calls();
    assert_eq!(calls[0][0].role, ChatRole::System);
    assert!(calls[0][0].content.contains("Auto-Welder V3"));
    let serial_obs = calls[1].last().unwrap();
    assert_eq!(serial_obs.role, ChatRole::Tool);
    assert_eq!(serial_obs.content, "AW3-2024-001255");
    assert!(calls[2].last().unwrap().content.starts_with("検索結果:\n"));

    model.push_text("二回目");
    let again = strategy.process("もう一度", false).await.unwrap();
    assert_eq!(step_names(&again)[1], "agent_cached");
}

#[tokio::test]
async fn agent_reports_unknown_tools_and_stops_at_iteration_limit() {
    let model = Arc::new(ScriptedModel::new());
    model.push_tool_call(ToolCall::new("c1", "nope", json!({})));
    model.push_text("done");
    let f = factory(model.clone(), small_chunk_settings());
    f.create(ExecutionMode::RetrievalAgent).unwrap().process("q", false).await.unwrap();
    assert!(model.calls()[1].last().unwrap().content.contains("Unknown tool 'nope'"));

    let looping = Arc::new(ScriptedModel::always_calling(ToolCall::new("c", "get_robot_serial_number", json!({}))));
    let mut settings = small_chunk_settings();
    settings.agent.max_iterations = 2;
    let err = factory(looping, settings)
        .create(ExecutionMode::RetrievalAgent)
        .unwrap()
        .process("q", false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AgentIterationLimit(2)));
}

#[test]
fn factory_caches_and_validates_modes() {
    let model = Arc::new(ScriptedModel::new());
    let f = factory(model.clone(), Settings::default());
    let a = f.create(ExecutionMode::ToolInvoking).unwrap();
    let b = f.create_named("function_calling").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(matches!(f.create_named("rag_magic"), Err(Error::UnknownMode(_))));

    let bare = StrategyFactory::new(Capabilities::llm_only(model), None, Settings::default());
    assert!(matches!(bare.create(ExecutionMode::ContextStuffing), Err(Error::InvalidConfig(_))));
}

#[test]
fn missing_knowledge_file_fails_before_any_model_call() {
    let model = Arc::new(ScriptedModel::new());
    let f = StrategyFactory::new(
        Capabilities::llm_only(model.clone()),
        Some(KnowledgeSource::file("/definitely/not/here.txt")),
        Settings::default(),
    );
    let err = f.create(ExecutionMode::ContextStuffing).err().unwrap();
    assert!(matches!(err, Error::KnowledgeSource(_)));
    assert!(err.is_configuration());
    assert_eq!(model.call_count(), 0);
}

#[test]
fn retrieval_modes_need_an_embedder() {
    let model = Arc::new(ScriptedModel::new());
    let f = StrategyFactory::new(Capabilities::llm_only(model), Some(knowledge()), Settings::default());
    assert!(matches!(f.create(ExecutionMode::RetrievalGrounded), Err(Error::InvalidConfig(_))));
}

#[derive(Default)]
struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

#[async_trait::async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, delay: Duration) {
        self.pauses.lock().unwrap().push(delay);
    }
}

#[tokio::test]
async fn pacing_only_in_demo_mode_when_enabled() {
    let pacer = Arc::new(RecordingPacer::default());
    let mut settings = Settings::default();
    settings.demo.pacing = true;
    let f = StrategyFactory::new(Capabilities::llm_only(Arc::new(ScriptedModel::new())), None, settings)
        .with_pacer(pacer.clone());
    let direct = f.create(ExecutionMode::Direct).unwrap();

    direct.process("q", false).await.unwrap();
    assert!(pacer.pauses.lock().unwrap().is_empty());
    direct.process("q", true).await.unwrap();
    assert_eq!(pacer.pauses.lock().unwrap().len(), 2);

    let off = Arc::new(RecordingPacer::default());
    let f = StrategyFactory::new(Capabilities::llm_only(Arc::new(ScriptedModel::new())), None, Settings::default())
        .with_pacer(off.clone());
    f.create(ExecutionMode::Direct).unwrap().process("q", true).await.unwrap();
    assert!(off.pauses.lock().unwrap().is_empty(), "pacing is off by default");
}

#[tokio::test]
async fn direct_mode_propagates_model_failure() {
    let model = Arc::new(ScriptedModel::new());
    model.push_error("503 service unavailable");
    let factory = StrategyFactory::new(Capabilities::llm_only(model.clone()), None, Settings::default());
    let err = factory.create(ExecutionMode::Direct).unwrap().process("q", false).await.unwrap_err();
    assert!(matches!(err, Error::Model(ref m) if m.contains("503")));
    assert!(!err.is_configuration());
}

#[tokio::test]
async fn embedding_failure_aborts_and_index_is_rebuilt_next_time() {
    let model = Arc::new(ScriptedModel::new());
    let mut settings = small_chunk_settings();
    settings.expansion.enabled = false;
    let strategy = factory_with_embedder(model.clone(), settings, Arc::new(FlakyEmbedder::new(1)))
        .create(ExecutionMode::RetrievalGrounded)
        .unwrap();

    let err = strategy.process("E-404", false).await.unwrap_err();
    assert!(matches!(err, Error::Embedding(ref m) if m.contains("crashed")));
    assert_eq!(model.call_count(), 0, "no model call after a failed build");

    let out = strategy.process("E-404", false).await.unwrap();
    let names = step_names(&out);
    assert!(names.contains(&"split_documents") && names.contains(&"create_vectorstore"));
    assert!(!names.contains(&"vectorstore_cached"));
}

#[tokio::test]
async fn expansion_failure_aborts_retrieval() {
    let model = Arc::new(ScriptedModel::new());
    model.push_error("timeout");
    let strategy = factory(model.clone(), small_chunk_settings()).create(ExecutionMode::RetrievalGrounded).unwrap();
    let err = strategy.process("E-404", false).await.unwrap_err();
    assert!(matches!(err, Error::Model(ref m) if m.contains("timeout")));
    assert_eq!(model.call_count(), 1, "generation never runs");
}

#[tokio::test]
async fn disabled_reranking_still_keeps_top_k() {
    let model = Arc::new(ScriptedModel::new());
    let mut settings = small_chunk_settings();
    settings.expansion.enabled = false;
    settings.rerank.enabled = false;
    settings.rerank.top_k = 2;
    settings.retrieval.vector_k = 5;
    let out = factory(model, settings)
        .create(ExecutionMode::RetrievalGrounded)
        .unwrap()
        .process("E-404 保証", false)
        .await
        .unwrap();
    let stats = out.retrieval_stats.unwrap();
    assert_eq!(stats.initial_candidates, 3);
    assert_eq!(stats.final_chunks, 2);
    assert!(!stats.reranking_applied);
}

#[tokio::test]
async fn agent_index_uses_agent_separators() {
    let model = Arc::new(ScriptedModel::new());
    let mut settings = small_chunk_settings();
    settings.agent.separators = Vec::new();
    let out = factory(model, settings).create(ExecutionMode::RetrievalAgent).unwrap().process("q", false).await.unwrap();
    let setup = out.intermediate_steps.iter().find(|s| s.step == "setup_rag").unwrap();
    assert_eq!(setup.data.as_ref().unwrap()["chunk_count"], 1, "no separators keeps the document whole");
}
