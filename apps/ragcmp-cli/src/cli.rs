use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use ragcmp_engine::ExecutionMode;

#[derive(Debug, Parser)]
#[command(author, version, about = "Compare ways of grounding a language model in a product manual")]
pub struct Cli {
    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer one question with one mode
    Ask {
        query: String,
        #[arg(short, long, default_value = "retrieval_grounded")]
        mode: ExecutionMode,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Answer one question with several modes concurrently
    Compare {
        query: String,
        /// Comma-separated; all modes when omitted
        #[arg(short, long, value_delimiter = ',')]
        modes: Vec<ExecutionMode>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Show how the knowledge document is chunked
    Chunks {
        #[arg(short, long)]
        knowledge: Option<PathBuf>,
        /// Use the agent's chunk sizes
        #[arg(long)]
        agent: bool,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// List logged runs, newest first
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Knowledge file; defaults to knowledge.path
    #[arg(short, long)]
    pub knowledge: Option<PathBuf>,
    /// Demo mode; pauses between steps when demo.pacing is on
    #[arg(long)]
    pub demo: bool,
    /// Print the execution trace
    #[arg(long)]
    pub steps: bool,
    /// Do not write a run record
    #[arg(long)]
    pub no_log: bool,
}
