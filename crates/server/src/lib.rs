//! Server crate provides HTTP server functionality.
//!
//! A thin adapter over [`OrderService`]: it decodes JSON bodies, calls the
//! service and maps its errors to status codes. Request metrics are exposed on
//! `/metrics` in the Prometheus text format.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{MatchedPath, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use model::Order;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use service::OrderService;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

mod dto;
mod error;

pub use dto::{CreateOrderRequest, CreateOrderWithItemsRequest, OrderItemDto, RequestedItemDto};
pub use error::ApiError;

/// Server represents an HTTP server for working with orders.
pub struct Server {
    service: Arc<dyn OrderService>,
    port: u16,
    shutdown_timeout: Duration,
    metrics: Arc<Metrics>,
}

/// Metrics collects and exposes HTTP server metrics.
struct Metrics {
    registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint"],
        )
        .expect("Failed to create http_request_duration_seconds metric");

        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of error responses"),
            &["endpoint", "status"],
        )
        .expect("Failed to create errors_total metric");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total metric");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("Failed to register http_request_duration_seconds metric");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("Failed to register errors_total metric");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
        }
    }

    fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
        if status >= 400 {
            self.errors_total
                .with_label_values(&[endpoint, &status.to_string()])
                .inc();
        }
    }
}

/// Application state shared between request handlers
#[derive(Clone)]
struct AppState {
    service: Arc<dyn OrderService>,
    metrics: Arc<Metrics>,
}

impl Server {
    /// Creates a new Server instance.
    ///
    /// # Arguments
    ///
    /// * `port` - The port on which the server will listen
    /// * `service` - The order service handling every request
    /// * `shutdown_timeout` - How long in-flight requests may run after a shutdown signal
    pub fn new(port: u16, service: Arc<dyn OrderService>, shutdown_timeout: Duration) -> Self {
        info!("Initializing HTTP server on port {}", port);

        Self {
            service,
            port,
            shutdown_timeout,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Starts the server and blocks until it's shut down.
    ///
    /// After Ctrl+C or SIGTERM the server stops accepting connections and
    /// waits at most `shutdown_timeout` for in-flight requests.
    pub async fn start(&self) -> Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        let shutdown_started = Arc::new(Notify::new());
        let notify = shutdown_started.clone();
        let serve = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    notify.notify_one();
                })
                .await
        };
        let deadline = async {
            shutdown_started.notified().await;
            tokio::time::sleep(self.shutdown_timeout).await;
        };

        tokio::select! {
            res = serve => res.context("Server error")?,
            _ = deadline => warn!("Graceful shutdown timed out, dropping in-flight requests"),
        }

        info!("HTTP server shut down");
        Ok(())
    }

    /// Builds the router with all order routes, health and metrics.
    pub fn router(&self) -> Router {
        let metrics = self.metrics.clone();

        Router::new()
            .route(
                "/orders",
                post(Self::handle_create_order).get(Self::handle_get_orders),
            )
            .route("/orders/direct", post(Self::handle_create_order_direct))
            .route("/orders/{id}", get(Self::handle_get_order_by_id))
            .route("/orders/{id}/status", put(Self::handle_update_status))
            .route("/health", get(Self::handle_health))
            .route("/metrics", get(Self::handle_metrics))
            .route_layer(axum::middleware::from_fn_with_state(
                metrics.clone(),
                Self::metrics_middleware,
            ))
            .with_state(AppState {
                service: self.service.clone(),
                metrics,
            })
    }

    /// Middleware for collecting metrics on HTTP requests
    async fn metrics_middleware(
        State(metrics): State<Arc<Metrics>>,
        req: axum::extract::Request,
        next: axum::middleware::Next,
    ) -> Response {
        let method = req.method().to_string();
        // Label by route template, not raw path, to keep label cardinality bounded.
        let endpoint = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| req.uri().path().to_owned());

        let start = std::time::Instant::now();
        let response = next.run(req).await;

        metrics.record_request(
            &method,
            &endpoint,
            response.status().as_u16(),
            start.elapsed(),
        );
        response
    }

    async fn handle_create_order(
        State(state): State<AppState>,
        Json(request): Json<CreateOrderRequest>,
    ) -> Result<Json<Order>, ApiError> {
        info!("Received create order request");
        let order = state.service.create_order(request.into()).await?;
        Ok(Json(order))
    }

    async fn handle_create_order_direct(
        State(state): State<AppState>,
        Json(request): Json<CreateOrderWithItemsRequest>,
    ) -> Result<Json<Order>, ApiError> {
        info!("Received direct create order request");
        let order = state.service.create_order_with_items(request.into()).await?;
        Ok(Json(order))
    }

    async fn handle_get_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
        info!("Received request to fetch all orders");
        Ok(Json(state.service.get_all_orders().await?))
    }

    async fn handle_get_order_by_id(
        State(state): State<AppState>,
        Path(order_id): Path<i64>,
    ) -> Result<Json<Order>, ApiError> {
        info!("Received order request for ID: {}", order_id);
        Ok(Json(state.service.get_order_by_id(order_id).await?))
    }

    async fn handle_update_status(
        State(state): State<AppState>,
        Path(order_id): Path<i64>,
    ) -> Result<Json<Order>, ApiError> {
        info!("Received status update for order ID: {}", order_id);
        Ok(Json(state.service.update_order_status(order_id).await?))
    }

    async fn handle_health() -> &'static str {
        "OK"
    }

    async fn handle_metrics(State(state): State<AppState>) -> Response {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&state.metrics.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
        }

        match String::from_utf8(buffer) {
            Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
            Err(e) => {
                error!("Failed to convert metrics to UTF-8: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Invalid metrics data").into_response()
            }
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
