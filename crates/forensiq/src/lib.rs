//! Client for the Forensiq fraud-scoring API.
//!
//! [`ForensiqClient::check`] sends a visitor's IP and ad-request metadata to
//! `GET /check` and returns the risk assessment; [`ForensiqClient::ready`]
//! asks `GET /ready` whether the service is up.

pub mod check;
pub mod client;
pub mod config;
pub mod context;
pub mod health;
pub mod metrics;
pub mod transport;

pub use check::{CheckRequest, CheckResponse, REQUEST_TYPE_CLICK, REQUEST_TYPE_DISPLAY};
pub use client::{ApiError, ForensiqClient};
pub use config::Config;
pub use context::{CallContext, ContextError};
pub use health::HealthCheck;
pub use metrics::{Metrics, PrometheusMetrics, RequestKind, RequestSample, ResponseStatus};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
pub use tokio_util::sync::CancellationToken;
