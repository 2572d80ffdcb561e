//! Conversion metrics.
//!
//! Counters are atomics; duration samples sit behind a mutex and feed the
//! P50/P95/P99 figures of each snapshot.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Maximum number of duration samples kept in memory.
const MAX_DURATION_SAMPLES: usize = 1000;

/// Thread-safe metrics collector shared by every traversal of a context.
#[derive(Debug)]
pub struct ConversionMetrics {
    /// Runs started.
    pub conversions_started: AtomicU64,
    /// Runs that produced output.
    pub conversions_succeeded: AtomicU64,
    /// Runs where paths existed but all failed.
    pub conversions_failed: AtomicU64,
    /// Runs where no path existed.
    pub conversions_no_path: AtomicU64,
    /// Runs cancelled by the caller.
    pub conversions_cancelled: AtomicU64,
    /// Alternate paths attempted after a failure.
    pub fallbacks: AtomicU64,
    /// Individual steps that failed.
    pub step_failures: AtomicU64,
    /// Handlers that failed to initialize.
    pub init_failures: AtomicU64,
    /// Input bytes of successful runs.
    pub total_input_bytes: AtomicU64,
    /// Output bytes of successful runs.
    pub total_output_bytes: AtomicU64,
    duration_samples: Mutex<VecDeque<Duration>>,
}

impl ConversionMetrics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self {
            conversions_started: AtomicU64::new(0),
            conversions_succeeded: AtomicU64::new(0),
            conversions_failed: AtomicU64::new(0),
            conversions_no_path: AtomicU64::new(0),
            conversions_cancelled: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            step_failures: AtomicU64::new(0),
            init_failures: AtomicU64::new(0),
            total_input_bytes: AtomicU64::new(0),
            total_output_bytes: AtomicU64::new(0),
            duration_samples: Mutex::new(VecDeque::with_capacity(MAX_DURATION_SAMPLES)),
        }
    }

    /// Record the start of a run.
    pub fn record_started(&self) {
        self.conversions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful run.
    pub fn record_success(&self, duration: Duration, input_bytes: u64, output_bytes: u64) {
        self.conversions_succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_input_bytes
            .fetch_add(input_bytes, Ordering::Relaxed);
        self.total_output_bytes
            .fetch_add(output_bytes, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    /// Record a run whose every path failed.
    pub fn record_failure(&self) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that found no path.
    pub fn record_no_path(&self) {
        self.conversions_no_path.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cancelled run.
    pub fn record_cancelled(&self) {
        self.conversions_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an alternate path being tried.
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed step.
    pub fn record_step_failure(&self) {
        self.step_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handler that could not initialize.
    pub fn record_init_failure(&self) {
        self.init_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn add_duration_sample(&self, duration: Duration) {
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() == MAX_DURATION_SAMPLES {
                samples.pop_front();
            }
            samples.push_back(duration);
        }
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut sorted: Vec<Duration> = self
            .duration_samples
            .lock()
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        sorted.sort_unstable();

        MetricsSnapshot {
            conversions_started: self.conversions_started.load(Ordering::Relaxed),
            conversions_succeeded: self.conversions_succeeded.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
            conversions_no_path: self.conversions_no_path.load(Ordering::Relaxed),
            conversions_cancelled: self.conversions_cancelled.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            step_failures: self.step_failures.load(Ordering::Relaxed),
            init_failures: self.init_failures.load(Ordering::Relaxed),
            total_input_bytes: self.total_input_bytes.load(Ordering::Relaxed),
            total_output_bytes: self.total_output_bytes.load(Ordering::Relaxed),
            duration_p50: percentile(&sorted, 50),
            duration_p95: percentile(&sorted, 95),
            duration_p99: percentile(&sorted, 99),
            sample_count: sorted.len() as u64,
        }
    }
}

/// Nearest-rank percentile of an ascending slice.
fn percentile(sorted: &[Duration], pct: usize) -> Option<Duration> {
    let rank = (sorted.len() * pct).div_ceil(100);
    sorted.get(rank.checked_sub(1)?).copied()
}

impl Default for ConversionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of [`ConversionMetrics`]. Durations are milliseconds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub conversions_started: u64,
    pub conversions_succeeded: u64,
    pub conversions_failed: u64,
    pub conversions_no_path: u64,
    pub conversions_cancelled: u64,
    pub fallbacks: u64,
    pub step_failures: u64,
    pub init_failures: u64,
    pub total_input_bytes: u64,
    pub total_output_bytes: u64,
    #[serde(with = "opt_millis")]
    pub duration_p50: Option<Duration>,
    #[serde(with = "opt_millis")]
    pub duration_p95: Option<Duration>,
    #[serde(with = "opt_millis")]
    pub duration_p99: Option<Duration>,
    pub sample_count: u64,
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
