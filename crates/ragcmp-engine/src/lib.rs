//! ragcmp-engine
//!
//! Execution modes, the strategies that implement them, the factory that
//! caches them, tools and the agent loop, and run records.
pub mod agent;
pub mod factory;
pub mod knowledge;
pub mod mode;
pub mod pacing;
pub mod prompts;
pub mod record;
pub mod strategy;
pub mod tools;

pub use factory::{Capabilities, StrategyFactory};
pub use knowledge::KnowledgeSource;
pub use mode::ExecutionMode;
pub use record::{RunLog, RunRecord, RunStatus};
pub use strategy::{Strategy, StrategyOutput};
