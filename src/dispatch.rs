//! The dispatch-and-finalize executor.
//!
//! One call to [`Dispatcher::dispatch`] walks a single request through
//!
//! ```text
//! Started ─▶ Running ─┬─▶ Succeeded ─┬─▶ Finalized ─▶ Done
//!                     └─▶ Failed ────┘
//! ```
//!
//! producing exactly one [`PipelineOutcome`], publishing it exactly once and
//! archiving exactly once. The archive obligation is held by a
//! [`FinalizeGuard`] from the moment the pipeline starts, so even a dispatch
//! future dropped halfway leaves a trace artifact behind.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use ingest::IngestRequest;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};
use transform::{ConversionError, FormatPipeline, PipelineKind, PipelineSet, classify, run_guarded};

use crate::archive::{Archiver, StorageError, TraceRecord, TraceStatus};
use crate::config::FilegateConfig;
use crate::metrics::{MetricsSpan, metrics_recorder};
use crate::publisher::{
    HEADER_CONTENT_TYPE, HEADER_ERR_CAUSE, HEADER_ERR_FILE_NAME, HEADER_FILE_NAME,
    OutboundMessage, Publisher, TransportError,
};
use crate::routing::{ArchiveTarget, Clock, MonotonicClock, RoutingTarget, derive_error_file_name};

/// Where a single dispatch currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Started,
    Running,
    Succeeded,
    Failed,
    Finalized,
    Done,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal dispatch transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: ExecutionState,
    pub to: ExecutionState,
}

impl ExecutionState {
    pub fn can_advance_to(self, next: ExecutionState) -> bool {
        use ExecutionState::*;
        matches!(
            (self, next),
            (Started, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Succeeded, Finalized)
                | (Failed, Finalized)
                | (Finalized, Done)
        )
    }

    pub fn advance(self, next: ExecutionState) -> Result<ExecutionState, InvalidTransition> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ExecutionState::Done
    }
}

fn step(state: &mut ExecutionState, next: ExecutionState) {
    match state.advance(next) {
        Ok(advanced) => {
            debug!(from = ?*state, to = ?advanced, "dispatch_state");
            *state = advanced;
        }
        Err(err) => error!(error = %err, "dispatch_state_rejected"),
    }
}

/// Result of running a pipeline. Exactly one per supported request.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Success {
        encoded: Bytes,
    },
    Failure {
        cause: ConversionError,
        err_file_name: String,
    },
}

/// What the transport hears back from a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchReport {
    /// Converted, published to the success target and archived.
    Delivered {
        pipeline: PipelineKind,
        archive_path: PathBuf,
    },
    /// Conversion failed; the raw body went to the dead-letter target and a
    /// trace record was archived.
    DeadLettered {
        pipeline: PipelineKind,
        err_file_name: String,
        cause: ConversionError,
        archive_path: PathBuf,
    },
    /// No pipeline for the content type. Nothing was published or archived.
    Unsupported { content_type: String },
}

impl DispatchReport {
    pub fn pipeline(&self) -> PipelineKind {
        match self {
            DispatchReport::Delivered { pipeline, .. }
            | DispatchReport::DeadLettered { pipeline, .. } => *pipeline,
            DispatchReport::Unsupported { .. } => PipelineKind::Unsupported,
        }
    }

    pub fn archive_path(&self) -> Option<&Path> {
        match self {
            DispatchReport::Delivered { archive_path, .. }
            | DispatchReport::DeadLettered { archive_path, .. } => Some(archive_path),
            DispatchReport::Unsupported { .. } => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, DispatchReport::Unsupported { .. })
    }
}

/// Failures the executor cannot absorb. Both surface only after the
/// finalize step has run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Holds the archive obligation for one dispatch.
///
/// [`FinalizeGuard::finalize`] discharges it. Dropping an armed guard (the
/// dispatch future was cancelled) archives an `abandoned` trace record on the
/// current Tokio runtime instead.
pub struct FinalizeGuard {
    archiver: Arc<dyn Archiver>,
    clock: Arc<dyn Clock>,
    directory: PathBuf,
    extension: String,
    abandoned: TraceRecord,
    armed: bool,
}

impl FinalizeGuard {
    pub fn arm(
        archiver: Arc<dyn Archiver>,
        clock: Arc<dyn Clock>,
        directory: PathBuf,
        extension: String,
        request: &IngestRequest,
        pipeline: PipelineKind,
    ) -> Self {
        Self {
            archiver,
            clock,
            directory,
            extension,
            abandoned: TraceRecord {
                status: TraceStatus::Abandoned,
                file_name: request.file_name().to_string(),
                content_type: request.content_type().to_string(),
                pipeline: pipeline.to_string(),
                stage: None,
                cause: None,
                err_file_name: None,
            },
            armed: true,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// The target is derived here, so the timestamp is the finalize time.
    fn target(&self) -> ArchiveTarget {
        ArchiveTarget::for_upload(
            &self.directory,
            &self.abandoned.file_name,
            self.clock.now_millis(),
            &self.extension,
        )
    }

    /// Writes the artifact. Disarms the guard whether or not the write, or
    /// the production of `content`, succeeded.
    pub async fn finalize(
        mut self,
        content: Result<Bytes, StorageError>,
    ) -> Result<PathBuf, StorageError> {
        self.armed = false;
        let content = content?;
        let target = self.target();
        self.archiver.archive(&target, content).await
    }
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        warn!(file_name = %self.abandoned.file_name, "dispatch_abandoned");
        let content = match self.abandoned.to_yaml() {
            Ok(content) => content,
            Err(err) => {
                error!(error = %err, "abandoned_trace_encode_failed");
                return;
            }
        };
        let target = self.target();
        let archiver = self.archiver.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match archiver.archive(&target, content).await {
                        Ok(path) => info!(path = %path.display(), "abandoned_trace_archived"),
                        Err(err) => error!(error = %err, "abandoned_trace_archive_failed"),
                    }
                });
            }
            Err(_) => error!(
                path = %target.path().display(),
                "abandoned_trace_dropped_outside_runtime"
            ),
        }
    }
}

/// Runs requests through their pipeline, publishes the outcome and archives
/// a trace. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct Dispatcher {
    pipelines: PipelineSet,
    publisher: Arc<dyn Publisher>,
    archiver: Arc<dyn Archiver>,
    clock: Arc<dyn Clock>,
    success: RoutingTarget,
    dead_letter: RoutingTarget,
    archive_directory: PathBuf,
    archive_extension: String,
}

impl Dispatcher {
    /// Default pipelines, routes and archive layout (`outputs/*.yaml`).
    pub fn new(publisher: Arc<dyn Publisher>, archiver: Arc<dyn Archiver>) -> Self {
        let pipelines = PipelineSet::default();
        let archive_extension = pipelines.encoder().extension().to_string();
        Self {
            pipelines,
            publisher,
            archiver,
            clock: Arc::new(MonotonicClock::new()),
            success: RoutingTarget::success(),
            dead_letter: RoutingTarget::dead_letter(),
            archive_directory: PathBuf::from("outputs"),
            archive_extension,
        }
    }

    /// Routes and archive layout from a loaded configuration.
    pub fn from_config(
        config: &FilegateConfig,
        publisher: Arc<dyn Publisher>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        Self::new(publisher, archiver)
            .with_routes(
                config.routing.success.clone(),
                config.routing.dead_letter.clone(),
            )
            .with_archive(
                config.archive.directory.clone(),
                config.archive.extension.clone(),
            )
    }

    pub fn with_pipelines(mut self, pipelines: PipelineSet) -> Self {
        self.pipelines = pipelines;
        self
    }

    pub fn with_routes(mut self, success: RoutingTarget, dead_letter: RoutingTarget) -> Self {
        self.success = success;
        self.dead_letter = dead_letter;
        self
    }

    pub fn with_archive(mut self, directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        self.archive_directory = directory.into();
        self.archive_extension = extension.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn publisher(&self) -> &Arc<dyn Publisher> {
        &self.publisher
    }

    pub fn archive_directory(&self) -> &Path {
        &self.archive_directory
    }

    /// Classifies `request` and, when a pipeline exists, runs it to a
    /// published and archived outcome.
    ///
    /// Conversion failures are not errors here: they are dead-lettered and
    /// reported as [`DispatchReport::DeadLettered`]. Only a broker or storage
    /// failure yields `Err`, and only after the archive step has run.
    pub async fn dispatch(&self, request: IngestRequest) -> Result<DispatchReport, DispatchError> {
        let kind = classify(request.content_type());
        let Some(pipeline) = self.pipelines.select(kind) else {
            warn!(
                request_id = %request.id(),
                file_name = %request.file_name(),
                content_type = ?request.content_type(),
                "dispatch_unsupported_content_type"
            );
            if let Some(recorder) = metrics_recorder() {
                recorder.record_rejected(request.content_type());
            }
            return Ok(DispatchReport::Unsupported {
                content_type: request.content_type().to_string(),
            });
        };

        let span = info_span!(
            "filegate.dispatch",
            request_id = %request.id(),
            file_name = %request.file_name(),
            content_type = ?request.content_type(),
            pipeline = %kind,
        );
        self.run(pipeline, &request).instrument(span).await
    }

    async fn run(
        &self,
        pipeline: &dyn FormatPipeline,
        request: &IngestRequest,
    ) -> Result<DispatchReport, DispatchError> {
        let kind = pipeline.kind();
        let dispatch_metrics = MetricsSpan::start(kind);
        let mut state = ExecutionState::Started;
        let guard = FinalizeGuard::arm(
            self.archiver.clone(),
            self.clock.clone(),
            self.archive_directory.clone(),
            self.archive_extension.clone(),
            request,
            kind,
        );

        step(&mut state, ExecutionState::Running);
        let conversion_metrics = MetricsSpan::start(kind);
        let converted = run_guarded(pipeline, request.body());
        if let Some(span) = conversion_metrics {
            span.record_conversion(converted.as_ref().map(|_| ()));
        }

        let outcome = match converted {
            Ok(encoded) => {
                step(&mut state, ExecutionState::Succeeded);
                info!(bytes = encoded.len(), "conversion_succeeded");
                PipelineOutcome::Success { encoded }
            }
            Err(cause) => {
                step(&mut state, ExecutionState::Failed);
                let err_file_name =
                    derive_error_file_name(request.file_name(), self.clock.now_millis());
                warn!(
                    stage = cause.stage(),
                    cause = %cause,
                    err_file_name = %err_file_name,
                    "conversion_failed"
                );
                PipelineOutcome::Failure {
                    cause,
                    err_file_name,
                }
            }
        };

        let published = self.publish(request, &outcome).await;
        if let Err(err) = &published {
            error!(error = %err, "outcome_publish_failed");
        }

        let archived = guard.finalize(self.artifact(request, kind, &outcome)).await;
        step(&mut state, ExecutionState::Finalized);
        match &archived {
            Ok(path) => info!(path = %path.display(), "trace_archived"),
            Err(err) => error!(error = %err, "trace_archive_failed"),
        }
        step(&mut state, ExecutionState::Done);

        let result = match (published, archived) {
            (Ok(()), Ok(archive_path)) => Ok(match outcome {
                PipelineOutcome::Success { .. } => DispatchReport::Delivered {
                    pipeline: kind,
                    archive_path,
                },
                PipelineOutcome::Failure {
                    cause,
                    err_file_name,
                } => DispatchReport::DeadLettered {
                    pipeline: kind,
                    err_file_name,
                    cause,
                    archive_path,
                },
            }),
            (Err(transport), _) => Err(DispatchError::Transport(transport)),
            (Ok(()), Err(storage)) => Err(DispatchError::Storage(storage)),
        };

        if let Some(span) = dispatch_metrics {
            span.record_dispatch(result.as_ref().map(|_| ()));
        }
        result
    }

    async fn publish(
        &self,
        request: &IngestRequest,
        outcome: &PipelineOutcome,
    ) -> Result<(), TransportError> {
        let message = |payload: Bytes| {
            OutboundMessage::new(payload)
                .with_header(HEADER_FILE_NAME, request.file_name())
                .with_header(HEADER_CONTENT_TYPE, request.content_type())
        };

        let (route, message) = match outcome {
            PipelineOutcome::Success { encoded } => (&self.success, message(encoded.clone())),
            PipelineOutcome::Failure {
                cause,
                err_file_name,
            } => (
                &self.dead_letter,
                message(request.body())
                    .with_header(HEADER_ERR_FILE_NAME, err_file_name.as_str())
                    .with_header(HEADER_ERR_CAUSE, cause.to_string()),
            ),
        };

        debug!(route = %route, "outcome_publishing");
        self.publisher.publish(route, message).await
    }

    fn artifact(
        &self,
        request: &IngestRequest,
        kind: PipelineKind,
        outcome: &PipelineOutcome,
    ) -> Result<Bytes, StorageError> {
        match outcome {
            PipelineOutcome::Success { encoded } => Ok(encoded.clone()),
            PipelineOutcome::Failure {
                cause,
                err_file_name,
            } => TraceRecord {
                status: TraceStatus::Failed,
                file_name: request.file_name().to_string(),
                content_type: request.content_type().to_string(),
                pipeline: kind.to_string(),
                stage: Some(cause.stage().to_string()),
                cause: Some(cause.to_string()),
                err_file_name: Some(err_file_name.clone()),
            }
            .to_yaml(),
        }
    }
}
