//! Per-invocation execution trace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub step: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Fractional Unix seconds.
    pub timestamp: f64,
}

impl TraceStep {
    pub fn new(step: impl Into<String>, description: impl Into<String>, data: Option<Value>) -> Self {
        Self { step: step.into(), description: description.into(), data, timestamp: now_secs() }
    }
}

/// Append-only list of steps for one `process` call.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: &str, description: impl Into<String>) {
        let description = description.into();
        tracing::debug!(step, %description, "trace");
        self.steps.push(TraceStep::new(step, description, None));
    }

    pub fn push_with(&mut self, step: &str, description: impl Into<String>, data: Value) {
        let description = description.into();
        tracing::debug!(step, %description, %data, "trace");
        self.steps.push(TraceStep::new(step, description, Some(data)));
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<TraceStep> {
        self.steps
    }
}

fn now_secs() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}
