use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

/// Process-local debate statistics, supplemental to the state machine's own
/// invariants. Mutated infrequently (once per turn, once per start/stop), so
/// a single coarse lock is enough.
#[derive(Default)]
pub struct Stats {
    inner: Mutex<Inner>,
}

#[derive(Default, Clone, Serialize)]
pub struct Inner {
    pub total_debates_started: u64,
    pub completed_debates: u64,
    pub total_tokens: u64,
    pub errors_by_provider: HashMap<String, u64>,
    #[serde(skip)]
    latency_sum_by_provider: HashMap<String, f64>,
    #[serde(skip)]
    latency_count_by_provider: HashMap<String, u64>,
}

#[derive(Serialize)]
pub struct StatsSnapshot {
    pub total_debates_started: u64,
    pub completed_debates: u64,
    pub total_tokens: u64,
    pub errors_by_provider: HashMap<String, u64>,
    pub avg_latency_ms_by_provider: HashMap<String, f64>,
    pub available_providers: Vec<String>,
}

impl Stats {
    pub fn on_start(&self) {
        self.inner.lock().unwrap().total_debates_started += 1;
    }

    pub fn on_turn(&self, provider: &str, tokens_used: u32, latency_ms: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.total_tokens += tokens_used as u64;
        *inner
            .latency_sum_by_provider
            .entry(provider.to_string())
            .or_insert(0.0) += latency_ms;
        *inner
            .latency_count_by_provider
            .entry(provider.to_string())
            .or_insert(0) += 1;
    }

    pub fn on_error(&self, provider: &str) {
        let mut inner = self.inner.lock().unwrap();
        *inner.errors_by_provider.entry(provider.to_string()).or_insert(0) += 1;
    }

    pub fn on_complete(&self) {
        self.inner.lock().unwrap().completed_debates += 1;
    }

    pub fn snapshot(&self, available_providers: Vec<String>) -> StatsSnapshot {
        let inner = self.inner.lock().unwrap();
        let avg_latency_ms_by_provider = inner
            .latency_sum_by_provider
            .iter()
            .map(|(provider, sum)| {
                let count = inner.latency_count_by_provider.get(provider).copied().unwrap_or(1);
                (provider.clone(), sum / count.max(1) as f64)
            })
            .collect();
        StatsSnapshot {
            total_debates_started: inner.total_debates_started,
            completed_debates: inner.completed_debates,
            total_tokens: inner.total_tokens,
            errors_by_provider: inner.errors_by_provider.clone(),
            avg_latency_ms_by_provider,
            available_providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_tokens_and_average_latency() {
        let stats = Stats::default();
        stats.on_turn("mock", 10, 100.0);
        stats.on_turn("mock", 20, 300.0);
        let snap = stats.snapshot(vec!["mock".to_string()]);
        assert_eq!(snap.total_tokens, 30);
        assert_eq!(snap.avg_latency_ms_by_provider["mock"], 200.0);
    }

    #[test]
    fn tracks_errors_per_provider() {
        let stats = Stats::default();
        stats.on_error("openai");
        stats.on_error("openai");
        let snap = stats.snapshot(vec![]);
        assert_eq!(snap.errors_by_provider["openai"], 2);
    }
}
