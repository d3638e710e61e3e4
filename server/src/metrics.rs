// Metrics collection and tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use llm_core::MultiplexStatsSnapshot;
use serde::Serialize;

/// Per-endpoint metrics
#[derive(Debug, Clone)]
pub struct EndpointMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub total_latency_ms: Arc<AtomicU64>,
    pub min_latency_ms: Arc<AtomicU64>,
    pub max_latency_ms: Arc<AtomicU64>,
    // Last 1000 samples, for percentiles
    pub latency_samples: Arc<std::sync::Mutex<Vec<u64>>>,
}

impl EndpointMetrics {
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            total_latency_ms: Arc::new(AtomicU64::new(0)),
            min_latency_ms: Arc::new(AtomicU64::new(u64::MAX)),
            max_latency_ms: Arc::new(AtomicU64::new(0)),
            latency_samples: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn record_request(&self, latency_ms: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.min_latency_ms.fetch_min(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);

        if let Ok(mut samples) = self.latency_samples.lock() {
            samples.push(latency_ms);
            if samples.len() > 1000 {
                samples.remove(0);
            }
        }
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    fn percentile(&self, p: u8) -> u64 {
        if let Ok(samples) = self.latency_samples.lock() {
            if samples.is_empty() {
                return 0;
            }
            let mut sorted = samples.clone();
            sorted.sort_unstable();
            let index = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
            sorted[index]
        } else {
            0
        }
    }

    pub fn stats(&self) -> EndpointStats {
        let min = self.min_latency_ms.load(Ordering::Relaxed);
        EndpointStats {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            avg_latency_ms: self.avg_latency_ms(),
            min_latency_ms: if min == u64::MAX { 0 } else { min },
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            p50_latency_ms: self.percentile(50),
            p95_latency_ms: self.percentile(95),
            p99_latency_ms: self.percentile(99),
        }
    }
}

impl Default for EndpointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Speech outcomes. Failures are swallowed, so they only show up here.
#[derive(Debug, Clone, Default)]
pub struct SpeechMetrics {
    pub audio_returned: Arc<AtomicU64>,
    pub silent: Arc<AtomicU64>,
    pub total_audio_ms: Arc<AtomicU64>,
}

impl SpeechMetrics {
    pub fn record(&self, duration_ms: Option<u64>) {
        match duration_ms {
            Some(ms) => {
                self.audio_returned.fetch_add(1, Ordering::Relaxed);
                self.total_audio_ms.fetch_add(ms, Ordering::Relaxed);
            }
            None => {
                self.silent.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> SpeechStats {
        SpeechStats {
            audio_returned: self.audio_returned.load(Ordering::Relaxed),
            silent: self.silent.load(Ordering::Relaxed),
            total_audio_ms: self.total_audio_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppMetrics {
    pub generate: EndpointMetrics,
    pub speech: EndpointMetrics,
    pub speech_outcomes: SpeechMetrics,
    pub started_at: Instant,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            generate: EndpointMetrics::new(),
            speech: EndpointMetrics::new(),
            speech_outcomes: SpeechMetrics::default(),
            started_at: Instant::now(),
        }
    }

    pub fn report(&self, multiplexer: MultiplexStatsSnapshot) -> MetricsResponse {
        MetricsResponse {
            timestamp: Utc::now(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            endpoints: EndpointMetricsResponse {
                generate: self.generate.stats(),
                speech: self.speech.stats(),
            },
            speech: self.speech_outcomes.stats(),
            multiplexer,
        }
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub endpoints: EndpointMetricsResponse,
    pub speech: SpeechStats,
    pub multiplexer: MultiplexStatsSnapshot,
}

#[derive(Serialize)]
pub struct EndpointMetricsResponse {
    pub generate: EndpointStats,
    pub speech: EndpointStats,
}

#[derive(Debug, Serialize)]
pub struct EndpointStats {
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SpeechStats {
    pub audio_returned: u64,
    pub silent: u64,
    pub total_audio_ms: u64,
}
