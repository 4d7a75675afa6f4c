use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

/// Submission instruments. Without a meter provider installed these are no-ops.
pub struct SubmissionMetrics {
    duration: Histogram<f64>,
    submissions: Counter<u64>,
}

impl SubmissionMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ];
        let duration = meter
            .f64_histogram("client_submission_duration_seconds")
            .with_description("Time from sending a detection to its interpreted result")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let submissions = meter
            .u64_counter("client_submissions_total")
            .with_description("Detection submissions by outcome")
            .build();

        Self {
            duration,
            submissions,
        }
    }

    pub fn record(&self, elapsed: Duration, outcome: &'static str) {
        let attributes = [KeyValue::new("outcome", outcome)];
        self.duration.record(elapsed.as_secs_f64(), &attributes);
        self.submissions.add(1, &attributes);
    }
}

impl Default for SubmissionMetrics {
    fn default() -> Self {
        Self::new("client")
    }
}
