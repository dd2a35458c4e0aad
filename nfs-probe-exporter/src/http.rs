//! HTTP server answering probe scrapes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::probe::Prober;
use crate::runner::CommandRunner;
use crate::snapshot::MetricsSnapshot;
use crate::target::ScrapeRequest;

/// Content type of the OpenMetrics text format.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Application state shared across handlers.
struct AppState<R> {
    prober: Arc<Prober<R>>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            prober: Arc::clone(&self.prober),
        }
    }
}

/// Create the HTTP router.
pub fn create_router<R: CommandRunner>(prober: Arc<Prober<R>>, probe_path: &str) -> Router {
    let state = AppState { prober };

    Router::new()
        .route(probe_path, get(probe_handler::<R>))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for probe scrapes: `?target=host:/path[&target=...][&name[]=...]`.
///
/// Every request runs a fresh probe; the response waits for it.
async fn probe_handler<R: CommandRunner>(
    State(state): State<AppState<R>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let request = match ScrapeRequest::from_pairs(&params) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected scrape");
            return (StatusCode::BAD_REQUEST, format!("{e}\n")).into_response();
        }
    };

    let snapshot = MetricsSnapshot::collect(&state.prober, &request.targets).await;

    match snapshot.render(&request.names) {
        Ok(body) => (StatusCode::OK, [("content-type", CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "error generating metric output\n",
            )
                .into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer<R> {
    prober: Arc<Prober<R>>,
    listen_addr: SocketAddr,
    probe_path: String,
}

impl<R: CommandRunner> HttpServer<R> {
    /// Create a new HTTP server.
    pub fn new(prober: Arc<Prober<R>>, listen_addr: SocketAddr, probe_path: String) -> Self {
        Self {
            prober,
            listen_addr,
            probe_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.prober, &self.probe_path);
        let addr = listener.local_addr()?;

        info!(
            addr = %addr,
            path = %self.probe_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProbeConfig, ProbeStrategy};
    use crate::runner::CommandOutput;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Runner exiting with a fixed status and counting calls.
    #[derive(Clone)]
    struct FixedRunner {
        status: i32,
        stdout: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl CommandRunner for FixedRunner {
        async fn run(&self, _program: &str, _args: &[String]) -> io::Result<CommandOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CommandOutput {
                status: Some(self.status),
                stdout: self.stdout.to_string(),
            })
        }
    }

    fn make_router(status: i32, strategy: ProbeStrategy) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = FixedRunner {
            status,
            stdout: "/a *\n/b *\n",
            calls: calls.clone(),
        };
        let config = ProbeConfig {
            strategy,
            ..Default::default()
        };
        let prober = Arc::new(Prober::new(runner, config));
        (create_router(prober, "/"), calls)
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_probe_success() {
        let (router, calls) = make_router(0, ProbeStrategy::Direct);

        let response = router
            .oneshot(
                Request::get("/?target=h1:/a&target=h2:/b")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("openmetrics-text"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("probe_success 1"));
        assert!(body.contains("probe_duration_seconds "));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_failure_is_ok_response() {
        let (router, calls) = make_router(2, ProbeStrategy::Direct);

        let (status, body) = get_body(router, "/?target=h1:/a&target=h2:/b").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("probe_success 0"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_export_list_strategy() {
        let (router, calls) = make_router(0, ProbeStrategy::ExportList);

        let (status, body) = get_body(router, "/?target=h1:/a&target=h1:/b").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("probe_success 1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_name_filter() {
        let (router, _) = make_router(0, ProbeStrategy::Direct);

        let (status, body) = get_body(router, "/?target=h1:/a&name%5B%5D=probe_success").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("probe_success"));
        assert!(!body.contains("probe_duration_seconds"));
    }

    #[tokio::test]
    async fn test_missing_target_is_bad_request() {
        let (router, calls) = make_router(0, ProbeStrategy::Direct);

        let (status, body) = get_body(router, "/").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("missing target"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_target_is_bad_request() {
        let (router, calls) = make_router(0, ProbeStrategy::Direct);

        let (status, body) = get_body(router, "/?target=no-separator").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("no-separator"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (router, _) = make_router(0, ProbeStrategy::Direct);

        let (status, body) = get_body(router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "healthy\n");
    }

    #[tokio::test]
    async fn test_custom_probe_path() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = FixedRunner {
            status: 0,
            stdout: "",
            calls,
        };
        let prober = Arc::new(Prober::new(runner, ProbeConfig::default()));
        let router = create_router(prober, "/probe");

        let (status, _) = get_body(router.clone(), "/probe?target=h:/a").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get_body(router, "/?target=h:/a").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
