//! Workspace umbrella crate for filegate.
//!
//! Stitches the ingest boundary and the transform pipelines to a broker and
//! an archive: a [`Dispatcher`] takes one [`IngestRequest`], converts it,
//! publishes either the YAML or a dead-letter message, and always leaves one
//! trace artifact on disk.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use filegate::{Dispatcher, FsArchiver, IngestConfig, IngestRequest, MemoryPublisher};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::new(Arc::new(MemoryPublisher::new()), Arc::new(FsArchiver));
//! let request = IngestRequest::new(
//!     "orders.csv",
//!     "text/csv",
//!     Bytes::from_static(b"id,qty\n1,2\n"),
//!     &IngestConfig::default(),
//! )?;
//! let report = dispatcher.dispatch(request).await?;
//! println!("{report:?}");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod dispatch;
mod metrics;
pub mod publisher;
pub mod routing;

pub use ingest::{IngestConfig, IngestError, IngestRequest};
pub use transform::{
    ConversionError, Encoder, PipelineKind, PipelineSet, Transformation, YamlEncoder, classify,
};

pub use crate::archive::{Archiver, FsArchiver, MemoryArchiver, StorageError, TraceRecord, TraceStatus};
pub use crate::config::{ArchiveConfig, ConfigLoadError, FilegateConfig, RoutingConfig};
pub use crate::dispatch::{
    DispatchError, DispatchReport, Dispatcher, ExecutionState, FinalizeGuard, InvalidTransition,
    PipelineOutcome,
};
pub use crate::metrics::{PipelineMetrics, set_pipeline_metrics};
#[cfg(feature = "amqp")]
pub use crate::publisher::AmqpPublisher;
pub use crate::publisher::{
    BrokerConfig, BrokerKind, MemoryPublisher, OutboundMessage, Publisher, TransportError,
};
pub use crate::routing::{
    ArchiveTarget, Clock, MonotonicClock, RoutingTarget, derive_error_file_name,
};
