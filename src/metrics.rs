use std::sync::Arc;

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::Result;

/// Metrics published by the exporter.
///
/// Job durations are a gauge keyed by job id and repository slug:
/// re-observing the same job replaces the previous value
/// (last-write-wins), which is the right steady-state representation
/// for "current observed duration of this job". A histogram would
/// accumulate forever across reprocessed jobs.
#[derive(Clone)]
pub struct Metrics {
    job_durations: GaugeVec,
}

impl Metrics {
    /// Create the metric set and register it with the provided registry.
    pub fn new(registry: &Registry) -> Result<Arc<Self>> {
        let job_durations = GaugeVec::new(
            Opts::new(
                "travisci_job_duration_seconds",
                "Duration in seconds of each TravisCI job",
            ),
            &["id", "slug"],
        )?;

        registry.register(Box::new(job_durations.clone()))?;

        Ok(Arc::new(Self { job_durations }))
    }

    /// Record the duration of one job, overwriting any prior value for
    /// the same {id, slug} pair.
    pub fn record_job_duration(&self, job_id: u64, slug: &str, seconds: f64) {
        self.job_durations
            .with_label_values(&[&job_id.to_string(), slug])
            .set(seconds);
    }
}

/// Encode the registry's current samples in the Prometheus text
/// exposition format.
pub fn gather(registry: &Registry) -> Result<String> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
