//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway endpoints
//! - Assemble the middleware chain (tracing, CORS, timeout, rate limit)
//! - Serve on a bound listener with graceful shutdown

use axum::{http::StatusCode, middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

use crate::config::{GatewayConfig, ServiceConfig};
use crate::health::{healthz, readyz, HealthProbe, HttpProbe};
use crate::http::handlers::{aggregate_status, list_routes, not_found, stats};
use crate::http::middleware::{rate_limit_middleware, trace_requests, RateLimiterState};
use crate::observability::{InMemoryMetricSink, MetricSink, RequestTracer, TableLabeler};
use crate::routing::{GatewayRouter, RegistryError, RouteRegistry};

/// Paths served by the gateway itself. Each is its own metric label.
pub const LOCAL_PATHS: [&str; 5] = ["/healthz", "/readyz", "/routes", "/status", "/stats"];

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ServiceConfig>,
    pub gateway: Arc<GatewayRouter>,
    pub sink: Arc<dyn MetricSink>,
    pub probe_timeout: Duration,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<RouteRegistry>,
    sink: Arc<dyn MetricSink>,
}

impl GatewayServer {
    /// Create a new server probing upstreams over HTTP.
    pub fn new(config: GatewayConfig) -> Result<Self, RegistryError> {
        let probe = Arc::new(HttpProbe::new(config.health_check.path.clone()));
        Self::with_components(config, probe, Arc::new(InMemoryMetricSink::new()))
    }

    /// Create a server with explicit probe and sink implementations.
    pub fn with_components(
        config: GatewayConfig,
        probe: Arc<dyn HealthProbe>,
        sink: Arc<dyn MetricSink>,
    ) -> Result<Self, RegistryError> {
        let registry = Arc::new(RouteRegistry::from_config(&config.routes)?);
        let gateway = Arc::new(GatewayRouter::new(registry.clone(), probe));

        let labeler = TableLabeler::new(registry.clone()).with_local_paths(LOCAL_PATHS);
        let tracer = Arc::new(RequestTracer::new(sink.clone(), Arc::new(labeler)));

        let state = AppState {
            service: Arc::new(config.service.clone()),
            gateway,
            sink: sink.clone(),
            probe_timeout: Duration::from_millis(config.health_check.timeout_ms),
        };

        let router = Self::build_router(&config, state, tracer);
        Ok(Self {
            router,
            config,
            registry,
            sink,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers added later wrap the earlier ones, so tracing is outermost.
    /// `Router::layer` wraps every route separately, so the concurrency cap
    /// uses one semaphore shared by all of them.
    fn build_router(config: &GatewayConfig, state: AppState, tracer: Arc<RequestTracer>) -> Router {
        let mut router = Router::new()
            .route("/healthz", get(healthz))
            .route("/readyz", get(readyz))
            .route("/routes", get(list_routes))
            .route("/status", get(aggregate_status))
            .route("/stats", get(stats))
            .fallback(not_found)
            .with_state(state);

        if config.features.rate_limiting {
            let limiter = Arc::new(RateLimiterState::new(&config.rate_limit));
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        router = router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections));

        if config.features.cors {
            router = router.layer(CorsLayer::permissive());
        }

        router.layer(middleware::from_fn_with_state(tracer, trace_requests))
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn sink(&self) -> &Arc<dyn MetricSink> {
        &self.sink
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. In-flight requests are drained before returning.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.registry.len(),
            rate_limiting = self.config.features.rate_limiting,
            caching = self.config.features.caching,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::health::ProbeFailure;
    use crate::observability::{MetricKey, Outcome, CORRELATION_ID_HEADER, RESPONSE_TIME_HEADER};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures_util::future::BoxFuture;
    use tower::ServiceExt;
    use url::Url;

    struct AlwaysUp;

    impl HealthProbe for AlwaysUp {
        fn check<'a>(&'a self, _upstream: &'a Url) -> BoxFuture<'a, Result<(), ProbeFailure>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct NeverAnswers;

    impl HealthProbe for NeverAnswers {
        fn check<'a>(&'a self, _upstream: &'a Url) -> BoxFuture<'a, Result<(), ProbeFailure>> {
            Box::pin(std::future::pending())
        }
    }

    fn server(config: GatewayConfig) -> GatewayServer {
        server_with_probe(config, Arc::new(AlwaysUp))
    }

    fn server_with_probe(mut config: GatewayConfig, probe: Arc<dyn HealthProbe>) -> GatewayServer {
        config.routes = vec![
            RouteConfig {
                path_prefix: "/api/v1/auth".into(),
                service: "auth".into(),
                upstream: "http://127.0.0.1:8001".into(),
            },
            RouteConfig {
                path_prefix: "/api/v1/search".into(),
                service: "search".into(),
                upstream: "http://127.0.0.1:8002".into(),
            },
        ];
        GatewayServer::with_components(config, probe, Arc::new(InMemoryMetricSink::new())).unwrap()
    }

    async fn get(router: Router, path: &str) -> axum::response::Response {
        router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_healthz_is_stamped() {
        let server = server(GatewayConfig::default());
        let response = get(server.router(), "/healthz").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
        assert!(response.headers().contains_key(RESPONSE_TIME_HEADER));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "gateway");
    }

    #[tokio::test]
    async fn test_routes_listing_in_order() {
        let server = server(GatewayConfig::default());
        let response = get(server.router(), "/routes").await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!([
                {"path": "/api/v1/auth", "service": "auth", "port": 8001},
                {"path": "/api/v1/search", "service": "search", "port": 8002},
            ])
        );
    }

    #[tokio::test]
    async fn test_dynamic_paths_collapse_to_route_label() {
        let server = server(GatewayConfig::default());
        for id in ["1", "2", "3"] {
            let response = get(server.router(), &format!("/api/v1/auth/users/{}", id)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        get(server.router(), "/nowhere/abc").await;

        let snapshot = server.sink().snapshot();
        assert_eq!(snapshot[&MetricKey::new("/api/v1/auth", Outcome::Success)].count, 3);
        assert_eq!(snapshot[&MetricKey::new("unmatched", Outcome::Success)].count, 1);
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_response_is_traced() {
        let mut config = GatewayConfig::default();
        config.features.rate_limiting = true;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst_size = 1;
        let server = server(config);

        assert_eq!(get(server.router(), "/readyz").await.status(), StatusCode::OK);
        let limited = get(server.router(), "/readyz").await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key(CORRELATION_ID_HEADER));

        let snapshot = server.sink().snapshot();
        assert_eq!(snapshot[&MetricKey::new("/readyz", Outcome::Success)].count, 2);
    }

    #[tokio::test]
    async fn test_status_reports_every_service() {
        let server = server(GatewayConfig::default());
        let response = get(server.router(), "/status").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["services"]["auth"]["reachable"], true);
        assert_eq!(json["services"]["search"]["reachable"], true);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_shared_across_routes() {
        let mut config = GatewayConfig::default();
        config.listener.max_connections = 1;
        config.health_check.timeout_ms = 60_000;
        let server = server_with_probe(config, Arc::new(NeverAnswers));

        let in_flight = tokio::spawn(get(server.router(), "/status"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The only permit is held by /status, so /healthz has to wait.
        let blocked =
            tokio::time::timeout(Duration::from_millis(200), get(server.router(), "/healthz")).await;
        assert!(blocked.is_err());

        in_flight.abort();
        let _ = in_flight.await;

        let released =
            tokio::time::timeout(Duration::from_secs(2), get(server.router(), "/healthz")).await;
        assert_eq!(released.unwrap().status(), StatusCode::OK);
    }
}
