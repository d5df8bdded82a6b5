//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the site handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and stop on shutdown
//! - Hand each request path to the resolver and answer its outcome

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::request::{decode_path, request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response;
use crate::observability::metrics;
use crate::resolve::Resolver;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

/// HTTP server for an exported site.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving through `resolver`.
    pub fn new(config: ServerConfig, resolver: Arc<Resolver>) -> Self {
        let state = AppState { resolver };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(site_handler))
            .route("/{*path}", get(site_handler))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal is broadcast.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            policy = %self.config.site.policy,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Resolve the request path and serve the chosen file.
async fn site_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let start_time = Instant::now();

    let path = match decode_path(uri.path()) {
        Ok(path) => path.into_owned(),
        Err(_) => {
            tracing::warn!(path = %uri.path(), "Request path is not valid UTF-8");
            metrics::record_request("bad_request", 400, start_time);
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    let resolver = state.resolver.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let resolution = resolver.resolve(&path);
        let outcome = resolution.outcome();
        tracing::debug!(path = %path, outcome, "Resolved request");
        let response = response::into_response(resolution, resolver.policy(), &method, &headers);
        (outcome, response)
    })
    .await;

    let (outcome, response) = match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Resolver task failed");
            ("error", response::internal_error())
        }
    };

    metrics::record_request(outcome, response.status().as_u16(), start_time);
    response
}
