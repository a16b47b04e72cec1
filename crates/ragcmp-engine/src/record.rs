use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ragcmp_core::trace::TraceStep;
use ragcmp_core::Error;

use crate::mode::ExecutionMode;
use crate::strategy::StrategyOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// One line of the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Local>,
    pub execution_mode: ExecutionMode,
    pub query: String,
    pub response: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
    /// Seconds.
    pub execution_time: f64,
    pub intermediate_steps: Vec<TraceStep>,
    pub demo_mode: bool,
    pub status: RunStatus,
    pub error_message: Option<String>,
}

/// Rough token count: one token per four chars.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

impl RunRecord {
    pub fn success(mode: ExecutionMode, query: &str, output: &StrategyOutput, elapsed: Duration, demo_mode: bool) -> Self {
        let input_tokens = estimate_tokens(output.actual_prompt.as_deref().unwrap_or(query));
        let output_tokens = estimate_tokens(&output.response);
        Self {
            timestamp: Local::now(),
            execution_mode: mode,
            query: query.to_string(),
            response: output.response.clone(),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            execution_time: elapsed.as_secs_f64(),
            intermediate_steps: output.intermediate_steps.clone(),
            demo_mode,
            status: RunStatus::Success,
            error_message: None,
        }
    }

    pub fn failure(mode: ExecutionMode, query: &str, error: &Error, elapsed: Duration, demo_mode: bool) -> Self {
        let input_tokens = estimate_tokens(query);
        Self {
            timestamp: Local::now(),
            execution_mode: mode,
            query: query.to_string(),
            response: String::new(),
            input_tokens,
            output_tokens: 0,
            total_tokens: input_tokens,
            execution_time: elapsed.as_secs_f64(),
            intermediate_steps: Vec::new(),
            demo_mode,
            status: RunStatus::Error,
            error_message: Some(error.to_string()),
        }
    }

    pub fn file_name(&self) -> String {
        let stamp = self.timestamp.format("%Y%m%d%H%M%S");
        match self.status {
            RunStatus::Success => format!("{stamp}_ragcmp.jsonl"),
            RunStatus::Error => format!("{stamp}_{}-error.jsonl", self.execution_mode),
        }
    }
}

/// JSONL run log directory. Records from the same second share a file.
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, record: &RunRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join(record.file_name());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        tracing::debug!(path = %path.display(), "run record written");
        Ok(path)
    }

    /// All readable records, newest first. Lines that fail to parse are skipped.
    pub fn list(&self) -> Result<Vec<RunRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<RunRecord>(line) {
                    Ok(r) => records.push(r),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record"),
                }
            }
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}
