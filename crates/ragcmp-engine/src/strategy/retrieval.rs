use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use ragcmp_core::chat::ChatMessage;
use ragcmp_core::chunker::Chunker;
use ragcmp_core::trace::Trace;
use ragcmp_core::traits::{CrossEncoder, Embedder};
use ragcmp_core::types::{Chunk, ExpandedQuerySet, RetrievalCandidate};
use ragcmp_core::{Error, Result};
use ragcmp_hybrid::{reorder, HybridRetriever, QueryExpander, Reranker};
use ragcmp_vector::VectorIndex;

use super::{preview, Lifecycle, RetrievalStats, StrategyContext, StrategyOutput};
use crate::knowledge::KnowledgeSource;
use crate::prompts;

struct IndexedKnowledge {
    chunks: Vec<Chunk>,
    index: VectorIndex,
}

/// Chunk, index once, then per query: expand, retrieve, rerank, reorder, generate.
pub struct RetrievalStrategy {
    ctx: StrategyContext,
    knowledge: KnowledgeSource,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    retriever: HybridRetriever,
    expander: QueryExpander,
    reranker: Option<Reranker>,
    state: Mutex<Lifecycle<IndexedKnowledge>>,
}

impl RetrievalStrategy {
    pub fn new(
        ctx: StrategyContext,
        knowledge: KnowledgeSource,
        embedder: Arc<dyn Embedder>,
        cross_encoder: Option<Arc<dyn CrossEncoder>>,
    ) -> Result<Self> {
        let settings = ctx.settings.clone();
        if settings.retrieval.vector_k == 0 || settings.retrieval.max_chunks == 0 {
            return Err(Error::InvalidConfig("retrieval.vector_k and retrieval.max_chunks must be positive".into()));
        }
        if settings.rerank.top_k == 0 || settings.rerank.candidate_k == 0 {
            return Err(Error::InvalidConfig("rerank.top_k and rerank.candidate_k must be positive".into()));
        }
        Ok(Self {
            chunker: Chunker::from_settings(&settings.chunking)?,
            retriever: HybridRetriever::from_settings(&settings.retrieval)?,
            expander: QueryExpander::new(settings.expansion.max_expansions)?,
            reranker: cross_encoder.map(|ce| Reranker::from_settings(ce, &settings.rerank)),
            ctx,
            knowledge,
            embedder,
            state: Mutex::new(Lifecycle::Uninitialized),
        })
    }

    async fn indexed(&self, trace: &mut Trace, demo_mode: bool) -> Result<Arc<IndexedKnowledge>> {
        let mut state = self.state.lock().await;
        if let Lifecycle::Ready(ready) = &*state {
            trace.push_with(
                "vectorstore_cached",
                "Reuse the vector index built earlier",
                json!({ "chunk_count": ready.chunks.len() }),
            );
            return Ok(ready.clone());
        }

        let document = self.knowledge.load()?;
        let chunks = self.chunker.split(&document);
        trace.push_with(
            "split_documents",
            format!("Split the document into {} chunks", chunks.len()),
            json!({
                "chunk_count": chunks.len(),
                "chunk_size": self.chunker.chunk_size(),
                "chunk_overlap": self.chunker.chunk_overlap(),
            }),
        );
        self.ctx.pacing.delay(demo_mode, 1.0).await;

        let batch = self.ctx.settings.models.embed_batch_size;
        let index = VectorIndex::build(self.embedder.clone(), chunks.clone(), batch)?;
        trace.push_with(
            "create_vectorstore",
            "Embed every chunk into the vector index",
            json!({ "embedding_model": self.embedder.model_id(), "dim": self.embedder.dim() }),
        );
        let ready = Arc::new(IndexedKnowledge { chunks, index });
        *state = Lifecycle::Ready(ready.clone());
        Ok(ready)
    }

    pub async fn process(&self, query: &str, demo_mode: bool) -> Result<StrategyOutput> {
        let settings = self.ctx.settings.clone();
        let mut trace = Trace::new();
        trace.push("initialize", "Initialize retrieval pipeline");
        self.ctx.pacing.delay(demo_mode, 0.3).await;

        let knowledge = self.indexed(&mut trace, demo_mode).await?;

        let expansion_applied = settings.expansion.enabled && self.expander.max_expansions() > 0;
        let queries = if expansion_applied {
            let set = self.expander.expand(query, self.ctx.llm.as_ref()).await?;
            trace.push_with(
                "query_expansion",
                format!("Expanded the query into {} queries", set.len()),
                json!({ "expanded_queries": set.as_slice() }),
            );
            set
        } else {
            trace.push("query_expansion_skipped", "Query expansion disabled");
            ExpandedQuerySet::new(query)
        };
        self.ctx.pacing.delay(demo_mode, 0.3).await;

        let rerank_possible = settings.rerank.enabled && self.reranker.is_some();
        let (vector_k, pool_limit) = if rerank_possible {
            (settings.rerank.candidate_k, settings.rerank.max_candidates)
        } else {
            (settings.retrieval.vector_k, settings.retrieval.max_chunks)
        };
        let candidates =
            self.retriever.retrieve_all(&queries, &knowledge.chunks, &knowledge.index, vector_k, pool_limit)?;
        let initial_candidates = candidates.len();
        if self.retriever.is_hybrid() {
            trace.push_with(
                "hybrid_retrieval",
                format!("Vector and keyword retrieval found {initial_candidates} candidates"),
                json!({ "candidate_count": initial_candidates, "query_count": queries.len(), "vector_k": vector_k }),
            );
        } else {
            trace.push("keyword_search_skipped", "Keyword matching disabled");
            trace.push_with(
                "vector_retrieval",
                format!("Vector retrieval found {initial_candidates} candidates"),
                json!({ "candidate_count": initial_candidates, "query_count": queries.len(), "vector_k": vector_k }),
            );
        }
        self.ctx.pacing.delay(demo_mode, 0.3).await;

        let top_k = settings.rerank.top_k;
        let (selected, reranking_applied) = match &self.reranker {
            Some(reranker) if settings.rerank.enabled && candidates.len() > top_k => {
                let reranked = reranker.rerank(queries.original(), candidates, top_k)?;
                trace.push_with(
                    "reranking",
                    format!("Cross-encoder kept {} of {} candidates", reranked.len(), initial_candidates),
                    json!({ "model": reranker.model_id(), "top_k": top_k }),
                );
                (reranked, true)
            }
            _ => {
                let reason = if !settings.rerank.enabled {
                    "disabled"
                } else if self.reranker.is_none() {
                    "no cross-encoder configured"
                } else {
                    "candidate pool not larger than top_k"
                };
                trace.push_with(
                    "reranking_skipped",
                    format!("Reranking skipped: {reason}"),
                    json!({ "candidate_count": initial_candidates }),
                );
                let mut kept = candidates;
                kept.truncate(top_k);
                (kept, false)
            }
        };
        self.ctx.pacing.delay(demo_mode, 0.3).await;

        let context_reordering_applied = settings.reorder.enabled;
        let final_chunks: Vec<RetrievalCandidate> = if context_reordering_applied {
            let reordered = reorder(selected);
            trace.push_with(
                "context_reorder",
                format!("Placed the strongest of {} chunks at the edges", reordered.len()),
                json!({ "preview": reordered.iter().take(2).map(|c| preview(c.text(), 80)).collect::<Vec<_>>() }),
            );
            reordered
        } else {
            trace.push("context_reorder_skipped", "Context reordering disabled");
            selected
        };

        let context = final_chunks.iter().map(|c| c.text()).collect::<Vec<_>>().join("\n\n");
        let prompt = prompts::retrieval(&context, query);
        trace.push_with(
            "generate",
            "Generate the answer from the retrieved context",
            json!({ "context_stats": {
                "total_chunks": final_chunks.len(),
                "total_characters": context.chars().count(),
                "expansion_queries_used": queries.len(),
            }}),
        );
        let response = self
            .ctx
            .llm
            .generate(&[ChatMessage::user(prompt.clone())])
            .await
            .map_err(Error::model)?;

        trace.push("complete", "Done");
        let stats = RetrievalStats {
            original_query: query.to_string(),
            expanded_queries: queries.as_slice().to_vec(),
            initial_candidates,
            final_chunks: final_chunks.len(),
            hybrid_applied: self.retriever.is_hybrid(),
            query_expansion_applied: expansion_applied,
            reranking_applied,
            context_reordering_applied,
        };
        Ok(StrategyOutput {
            response,
            intermediate_steps: trace.into_steps(),
            actual_prompt: Some(prompt),
            retrieval_stats: Some(stats),
        })
    }
}
