use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Artificial delays between pipeline stages, so a live demo can be followed.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pause(&self, _delay: Duration) {}
}

pub struct TokioSleepPacer;

#[async_trait]
impl Pacer for TokioSleepPacer {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Pacer plus the `demo.pacing` switch. Delays run only when both the
/// switch and the per-request demo flag are on.
#[derive(Clone)]
pub struct Pacing {
    pacer: Arc<dyn Pacer>,
    enabled: bool,
}

impl Pacing {
    pub fn new(pacer: Arc<dyn Pacer>, enabled: bool) -> Self {
        Self { pacer, enabled }
    }

    pub fn off() -> Self {
        Self::new(Arc::new(NoPacing), false)
    }

    pub async fn delay(&self, demo_mode: bool, secs: f64) {
        if self.enabled && demo_mode {
            self.pacer.pause(Duration::from_secs_f64(secs)).await;
        }
    }
}
