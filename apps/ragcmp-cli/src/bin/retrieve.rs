use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use ragcmp_cli::{init_tracing, AppContext};
use ragcmp_core::chunker::Chunker;
use ragcmp_hybrid::{HybridRetriever, Reranker};
use ragcmp_vector::VectorIndex;

/// Chunk, embed and query the knowledge document without a language model.
#[derive(Debug, Parser)]
#[command(author, version)]
struct Args {
    query: String,
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
    #[arg(short, long)]
    knowledge: Option<PathBuf>,
    /// Overrides retrieval.vector_k
    #[arg(short = 'k', long)]
    vector_k: Option<usize>,
    /// Overrides retrieval.max_chunks
    #[arg(long)]
    max_chunks: Option<usize>,
    /// Skip the keyword rules
    #[arg(long)]
    vector_only: bool,
    /// Rerank the hits with the configured cross-encoder
    #[arg(long)]
    rerank: bool,
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);
    let app = AppContext::load(&args.config_dir)?;
    let settings = &app.settings;

    let document = app.knowledge(args.knowledge.as_deref()).load()?;
    let chunks = Chunker::from_settings(&settings.chunking)?.split(&document);
    println!("{}: {} chunks", document.source, chunks.len());

    let embedder = ragcmp_embed::get_default_embedder(&settings.models, &app.base)?;
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")?
            .progress_chars("#>-"),
    );
    let index = VectorIndex::build_with_progress(
        embedder,
        chunks.clone(),
        settings.models.embed_batch_size,
        |done, _| pb.set_position(done as u64),
    )?;
    pb.finish_with_message("indexed");

    let mut retrieval = settings.retrieval.clone();
    retrieval.hybrid = !args.vector_only;
    if let Some(k) = args.vector_k {
        retrieval.vector_k = k;
    }
    let max_chunks = args.max_chunks.unwrap_or(retrieval.max_chunks);
    let retriever = HybridRetriever::from_settings(&retrieval)?;
    let mut hits = if retriever.is_hybrid() {
        retriever.retrieve(&args.query, &chunks, &index, max_chunks)?
    } else {
        retriever.vector_only(&args.query, &index, max_chunks.min(retrieval.vector_k))?
    };

    if args.rerank {
        match ragcmp_embed::get_default_cross_encoder(&settings.models, &app.base)? {
            Some(encoder) => {
                let reranker = Reranker::from_settings(encoder, &settings.rerank);
                hits = reranker.rerank(&args.query, hits, settings.rerank.top_k)?;
            }
            None => println!("(no cross-encoder configured, showing unreranked hits)"),
        }
    }

    println!("\nFound {} chunks for: \"{}\"", hits.len(), args.query);
    for (i, hit) in hits.iter().enumerate() {
        let score = hit.score.map(|s| format!("{s:.4}")).unwrap_or_else(|| "-".to_string());
        println!(
            "\n  {}. {:?} score={} chunk #{} [{}..{}]",
            i + 1,
            hit.source,
            score,
            hit.chunk.span.index,
            hit.chunk.span.start,
            hit.chunk.span.end
        );
        println!("     {}", hit.text().replace('\n', "\n     "));
    }
    Ok(())
}
