//! Filegate Server - HTTP upload endpoint for the filegate conversion gateway
//!
//! Accepts `POST /file/{fileName}` uploads, hands them to a
//! [`filegate::Dispatcher`] and reports the outcome as an HTTP status. Converted
//! and dead-lettered uploads both answer `200`; the caller is not told which.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe (broker reachable)
//! - `GET /metrics` - Prometheus metrics
//! - `POST /file/{fileName}` - Upload a CSV, XML or JSON file
//!
//! | Outcome | Status |
//! |---------|--------|
//! | converted or dead-lettered | 200 |
//! | invalid file name | 400 |
//! | body too large | 413 |
//! | unsupported content type | 415 |
//! | storage failure | 500 |
//! | broker failure | 502 |

pub mod config;
pub mod error;
pub mod pipeline_metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
