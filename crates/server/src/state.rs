use crate::config::ServerConfig;
use crate::error::ServerResult;
use filegate::{Dispatcher, FilegateConfig, FsArchiver, IngestConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Pipeline configuration (broker, routing, archive, ingest)
    pub pipeline: Arc<FilegateConfig>,

    /// Dispatcher shared by every upload
    pub dispatcher: Arc<Dispatcher>,

    /// Prometheus render handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create state around an already wired dispatcher
    pub fn new(config: ServerConfig, pipeline: FilegateConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            dispatcher: Arc::new(dispatcher),
            metrics: None,
        }
    }

    /// Load the pipeline file named by the server config, connect to the
    /// broker and archive to the local file system.
    pub async fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = match &config.pipeline_config {
            Some(path) => FilegateConfig::from_file(path)?,
            None => FilegateConfig::default(),
        };

        let publisher = filegate::publisher::connect(&pipeline.broker).await?;
        let dispatcher = Dispatcher::from_config(&pipeline, publisher, Arc::new(FsArchiver));

        tracing::info!(
            pipeline = ?pipeline.name,
            broker = ?pipeline.broker.kind,
            success = %pipeline.routing.success,
            dead_letter = %pipeline.routing.dead_letter,
            archive_dir = %pipeline.archive.directory.display(),
            "pipeline_configured"
        );

        Ok(Self::new(config, pipeline, dispatcher))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn ingest_config(&self) -> &IngestConfig {
        &self.pipeline.ingest
    }
}
