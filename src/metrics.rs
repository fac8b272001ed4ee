/// Per-adapter fetch metrics
///
/// Tracks success rates, error counts, and response times for each adapter
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterMetrics {
    pub adapter: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub average_response_time_ms: f64,
    pub total_response_time_ms: u64,
    pub rate_limit_hits: u64,
    pub timeout_count: u64,
}

impl AdapterMetrics {
    pub fn new(adapter: String) -> Self {
        Self {
            adapter,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            last_success: None,
            last_failure: None,
            last_error: None,
            average_response_time_ms: 0.0,
            total_response_time_ms: 0,
            rate_limit_hits: 0,
            timeout_count: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.successful_requests as f64 / self.total_requests as f64) * 100.0
        }
    }

    pub fn record_success(&mut self, response_time: Duration) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.last_success = Some(Utc::now());

        self.total_response_time_ms += response_time.as_millis() as u64;
        self.average_response_time_ms =
            self.total_response_time_ms as f64 / self.successful_requests as f64;
    }

    pub fn record_failure(&mut self, error: &str) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.last_failure = Some(Utc::now());
        self.last_error = Some(error.to_string());

        let lower = error.to_lowercase();
        if error.contains("429") || lower.contains("rate limit") {
            self.rate_limit_hits += 1;
        } else if lower.contains("timeout") || lower.contains("timed out") {
            self.timeout_count += 1;
        }
    }
}

/// Shared metrics tracker, one entry per adapter name.
#[derive(Default)]
pub struct MetricsTracker {
    metrics: Mutex<HashMap<String, AdapterMetrics>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<F: FnOnce(&mut AdapterMetrics)>(&self, adapter: &str, f: F) {
        // A poisoned lock only loses metrics, never the fetch itself.
        if let Ok(mut metrics) = self.metrics.lock() {
            let entry = metrics
                .entry(adapter.to_string())
                .or_insert_with(|| AdapterMetrics::new(adapter.to_string()));
            f(entry);
        }
    }

    pub fn record_success(&self, adapter: &str, response_time: Duration) {
        self.with_entry(adapter, |m| {
            m.record_success(response_time);
            log::debug!(
                "[{}] Success - Response time: {}ms - Success rate: {:.2}%",
                adapter,
                response_time.as_millis(),
                m.success_rate()
            );
        });
    }

    pub fn record_failure(&self, adapter: &str, error: &str) {
        self.with_entry(adapter, |m| {
            m.record_failure(error);
            log::warn!(
                "[{}] Failure - Error: {} - Success rate: {:.2}%",
                adapter,
                error,
                m.success_rate()
            );
        });
    }

    pub fn get_metrics(&self, adapter: &str) -> Option<AdapterMetrics> {
        self.metrics.lock().ok()?.get(adapter).cloned()
    }

    pub fn get_all_metrics(&self) -> Vec<AdapterMetrics> {
        let mut all: Vec<AdapterMetrics> = self
            .metrics
            .lock()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by(|a, b| a.adapter.cmp(&b.adapter));
        all
    }

    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(&self.get_all_metrics()).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let tracker = MetricsTracker::new();
        tracker.record_success("omegascans", Duration::from_millis(100));
        tracker.record_success("omegascans", Duration::from_millis(300));
        tracker.record_failure("omegascans", "Fetch failed: 429 Too Many Requests");

        let m = tracker.get_metrics("omegascans").unwrap();
        assert_eq!(m.total_requests, 3);
        assert_eq!(m.rate_limit_hits, 1);
        assert_eq!(m.average_response_time_ms, 200.0);
        assert!((m.success_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_export_json_lists_every_adapter() {
        let tracker = MetricsTracker::new();
        tracker.record_failure("manhuafast", "request timed out");
        tracker.record_success("omegascans", Duration::from_millis(5));

        let json: Vec<AdapterMetrics> = serde_json::from_str(&tracker.export_json()).unwrap();
        assert_eq!(json.len(), 2);
        assert_eq!(json[0].adapter, "manhuafast");
        assert_eq!(json[0].timeout_count, 1);
    }
}
