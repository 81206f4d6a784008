//! Prometheus counters plus a parallel JSON view, following the dual
//! bookkeeping shape the teacher uses when a value pushed to the metrics
//! registry also needs to be read back out-of-band.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use parking_lot::Mutex;
use serde::Serialize;

const ASSESSMENTS_STARTED: &str = "assessments_started";
const ASSESSMENTS_COMPLETED: &str = "assessments_completed";
const RECEIPT_VERIFICATIONS: &str = "receipt_verifications";
const RECEIPT_VERIFICATION_FAILURES: &str = "receipt_verification_failures";
const VERIFY_DURATION_SECONDS: &str = "verify_duration_seconds";

const LATENCY_SAMPLE_CAP: usize = 1000;

#[derive(Debug, Default)]
struct Counts {
    assessments_started: u64,
    assessments_completed: u64,
    receipt_verifications: u64,
    receipt_verification_failures: u64,
}

pub struct AppMetrics {
    counts: Mutex<Counts>,
    latencies: Mutex<Vec<f64>>,
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(Counts::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn describe_all() {
        describe_counter!(ASSESSMENTS_STARTED, "Total assessments started");
        describe_counter!(ASSESSMENTS_COMPLETED, "Total assessments completed");
        describe_counter!(RECEIPT_VERIFICATIONS, "Total receipt verification requests handled");
        describe_counter!(
            RECEIPT_VERIFICATION_FAILURES,
            "Total receipt verification requests that raised a handler-level exception"
        );
        describe_histogram!(VERIFY_DURATION_SECONDS, "Duration of /verify handling in seconds");
    }

    pub fn assessment_started(&self) {
        self.counts.lock().assessments_started += 1;
        counter!(ASSESSMENTS_STARTED).increment(1);
    }

    pub fn assessment_completed(&self) {
        self.counts.lock().assessments_completed += 1;
        counter!(ASSESSMENTS_COMPLETED).increment(1);
    }

    /// Increments on every `/verify` call that produces a verdict, whether
    /// `valid:true` or `valid:false` — only a handler-level exception skips
    /// this and increments [`Self::receipt_verification_failure`] instead.
    pub fn receipt_verification(&self, elapsed: Duration) {
        self.counts.lock().receipt_verifications += 1;
        counter!(RECEIPT_VERIFICATIONS).increment(1);
        histogram!(VERIFY_DURATION_SECONDS).record(elapsed.as_secs_f64());

        let mut latencies = self.latencies.lock();
        latencies.push(elapsed.as_secs_f64());
        if latencies.len() > LATENCY_SAMPLE_CAP {
            let overflow = latencies.len() - LATENCY_SAMPLE_CAP;
            latencies.drain(0..overflow);
        }
    }

    /// Handler-level exception path only — never incremented for a
    /// `valid:false` verdict.
    pub fn receipt_verification_failure(&self) {
        self.counts.lock().receipt_verification_failures += 1;
        counter!(RECEIPT_VERIFICATION_FAILURES).increment(1);
    }

    fn percentile(&self, p: f64) -> f64 {
        let mut samples = self.latencies.lock().clone();
        if samples.is_empty() {
            return 0.0;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((samples.len() as f64 - 1.0) * p).round() as usize;
        samples[idx]
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counts = self.counts.lock();
        MetricsSnapshot {
            assessments_started: counts.assessments_started,
            assessments_completed: counts.assessments_completed,
            receipt_verifications: counts.receipt_verifications,
            receipt_verification_failures: counts.receipt_verification_failures,
            verify_latency_p50: self.percentile(0.50),
            verify_latency_p90: self.percentile(0.90),
            verify_latency_p99: self.percentile(0.99),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub assessments_started: u64,
    pub assessments_completed: u64,
    pub receipt_verifications: u64,
    pub receipt_verification_failures: u64,
    pub verify_latency_p50: f64,
    pub verify_latency_p90: f64,
    pub verify_latency_p99: f64,
}
