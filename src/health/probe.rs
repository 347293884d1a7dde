//! Upstream health probing.
//!
//! # Responsibilities
//! - Issue a single `GET` against an upstream's health path
//! - Classify the result as success, connection error or bad status
//!
//! Deadlines are not applied here; the caller bounds every probe.

use std::time::Duration;

use axum::body::Body;
use hyper::{Method, Request};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

/// Why a probe did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("unhealthy status {0}")]
    Status(u16),
}

/// HTTP client capability used by the gateway router.
pub trait HealthProbe: Send + Sync {
    /// Probe `upstream` once. Resolves to `Ok` on a 2xx answer.
    fn check<'a>(&'a self, upstream: &'a Url) -> BoxFuture<'a, Result<(), ProbeFailure>>;
}

/// Probes `GET {upstream}{path}` over plain HTTP.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
    path: String,
}

impl HttpProbe {
    pub fn new(path: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Self {
            client,
            path: path.into(),
        }
    }

    fn target(&self, upstream: &Url) -> Result<String, ProbeFailure> {
        upstream
            .join(&self.path)
            .map(String::from)
            .map_err(|e| ProbeFailure::Connection(format!("invalid probe url: {}", e)))
    }
}

impl HealthProbe for HttpProbe {
    fn check<'a>(&'a self, upstream: &'a Url) -> BoxFuture<'a, Result<(), ProbeFailure>> {
        Box::pin(async move {
            let target = self.target(upstream)?;
            let request = Request::builder()
                .method(Method::GET)
                .uri(target.as_str())
                .header("user-agent", "meshgate-health-check")
                .body(Body::empty())
                .map_err(|e| ProbeFailure::Connection(e.to_string()))?;

            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ProbeFailure::Connection(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(ProbeFailure::Status(status.as_u16()))
            }
        })
    }
}
