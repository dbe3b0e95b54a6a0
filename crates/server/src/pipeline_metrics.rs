//! Prometheus-backed pipeline metrics.

use std::time::Duration;

use filegate::{ConversionError, DispatchError, PipelineKind, PipelineMetrics};
use metrics::{counter, histogram};

/// Forwards dispatch observations to the global `metrics` recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetrics;

impl PipelineMetrics for PrometheusMetrics {
    fn record_conversion(
        &self,
        pipeline: PipelineKind,
        latency: Duration,
        result: Result<(), &ConversionError>,
    ) {
        let outcome = match result {
            Ok(()) => "converted",
            Err(err) => err.stage(),
        };
        counter!(
            "filegate_conversions_total",
            "pipeline" => pipeline.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!(
            "filegate_conversion_seconds",
            "pipeline" => pipeline.as_str()
        )
        .record(latency.as_secs_f64());
    }

    fn record_dispatch(
        &self,
        pipeline: PipelineKind,
        latency: Duration,
        result: Result<(), &DispatchError>,
    ) {
        let outcome = match result {
            Ok(()) => "ok",
            Err(DispatchError::Transport(_)) => "transport_error",
            Err(DispatchError::Storage(_)) => "storage_error",
        };
        counter!(
            "filegate_dispatches_total",
            "pipeline" => pipeline.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!(
            "filegate_dispatch_seconds",
            "pipeline" => pipeline.as_str()
        )
        .record(latency.as_secs_f64());
    }

    fn record_rejected(&self, content_type: &str) {
        counter!(
            "filegate_rejected_total",
            "content_type" => content_type.to_string()
        )
        .increment(1);
    }
}
