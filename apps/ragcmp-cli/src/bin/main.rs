use anyhow::Result;
use clap::Parser;
use futures::future::join_all;

use ragcmp_cli::cli::{Cli, Command, RunArgs};
use ragcmp_cli::{init_tracing, render_record, run_mode, AppContext};
use ragcmp_core::chunker::Chunker;
use ragcmp_engine::{ExecutionMode, RunRecord, RunStatus};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    let app = AppContext::load(&cli.config_dir)?;

    match cli.command {
        Command::Ask { query, mode, run } => {
            let factory = app.factory(&[mode], run.knowledge.as_deref())?;
            let record = run_mode(&factory, mode, &query, run.demo).await;
            finish(&app, &[record], &run)?;
        }
        Command::Compare { query, modes, run } => {
            let modes = if modes.is_empty() { ExecutionMode::ALL.to_vec() } else { modes };
            let factory = app.factory(&modes, run.knowledge.as_deref())?;
            let records = join_all(modes.iter().map(|&m| run_mode(&factory, m, &query, run.demo))).await;
            finish(&app, &records, &run)?;
        }
        Command::Chunks { knowledge, agent, limit } => {
            let settings = &app.settings;
            let chunker = if agent {
                Chunker::new(settings.agent.chunk_size, settings.agent.chunk_overlap, settings.agent.separators.clone())?
            } else {
                Chunker::from_settings(&settings.chunking)?
            };
            let document = app.knowledge(knowledge.as_deref()).load()?;
            let chunks = chunker.split(&document);
            println!(
                "{}: {} chunks (size {}, overlap {})",
                document.source,
                chunks.len(),
                chunker.chunk_size(),
                chunker.chunk_overlap()
            );
            for chunk in chunks.iter().take(limit) {
                println!("\n#{} [{}..{}] {} chars", chunk.span.index, chunk.span.start, chunk.span.end, chunk.char_len());
                println!("{}", chunk.text.trim_end());
            }
        }
        Command::History { limit } => {
            let log = app.run_log();
            let records = log.list()?;
            println!("{} runs in {}", records.len(), log.dir().display());
            for r in records.iter().take(limit) {
                println!(
                    "{}  {:<20} {:?}  {:.2}s  {}",
                    r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    r.execution_mode,
                    r.status,
                    r.execution_time,
                    r.query
                );
            }
        }
    }
    Ok(())
}

fn finish(app: &AppContext, records: &[RunRecord], run: &RunArgs) -> Result<()> {
    for record in records {
        println!("{}", render_record(record, run.steps));
    }
    if !run.no_log {
        let log = app.run_log();
        for record in records {
            let path = log.write(record)?;
            tracing::debug!(path = %path.display(), "logged");
        }
    }
    let failed = records.iter().filter(|r| r.status == RunStatus::Error).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} runs failed", records.len());
    }
    Ok(())
}
