use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use transform::{ConversionError, PipelineKind};

use crate::dispatch::DispatchError;

/// Metrics observer for dispatch stages.
pub trait PipelineMetrics: Send + Sync {
    /// Parse, transform and encode of one request.
    fn record_conversion(
        &self,
        pipeline: PipelineKind,
        latency: Duration,
        result: Result<(), &ConversionError>,
    );

    /// The whole dispatch, publish and archive included.
    fn record_dispatch(
        &self,
        pipeline: PipelineKind,
        latency: Duration,
        result: Result<(), &DispatchError>,
    );

    /// A request whose content type has no pipeline.
    fn record_rejected(&self, content_type: &str);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    pipeline: PipelineKind,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start(pipeline: PipelineKind) -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            pipeline,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_conversion(self, result: Result<(), &ConversionError>) {
        self.recorder
            .record_conversion(self.pipeline, self.start.elapsed(), result);
    }

    pub(crate) fn record_dispatch(self, result: Result<(), &DispatchError>) {
        self.recorder
            .record_dispatch(self.pipeline, self.start.elapsed(), result);
    }
}
