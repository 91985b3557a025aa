//! HTTP API server with observability for the order orchestration service.
//!
//! Exposes the order lifecycle over REST, runs the fulfillment-completed
//! consumer, and serves structured logs (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{Money, Part};
use messaging::{EventSubscriber, InMemoryBroker, MessageHandler, OrderPaidProducer};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use orchestrator::{
    FulfillmentCompletedHandler, InMemoryCatalogClient, InMemoryPaymentClient, OrderOrchestrator,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let orders = Router::new()
        .route("/", post(routes::orders::create))
        .route("/{id}", get(routes::orders::get))
        .route("/{id}/pay", post(routes::orders::pay))
        .route("/{id}/cancel", post(routes::orders::cancel));

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/v1/orders", orders)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Parts available from the in-memory catalog.
pub fn demo_parts() -> Vec<Part> {
    vec![
        Part::new("main-engine", "Main engine", Money::from_cents(1_250_000), 4),
        Part::new("fuel-tank", "Fuel tank", Money::from_cents(320_000), 12),
        Part::new("porthole", "Porthole", Money::from_cents(45_000), 30),
        Part::new("wing", "Wing", Money::from_cents(210_000), 8),
    ]
}

/// Creates the application state: orchestrator over `store`, the in-memory
/// catalog and payment clients, and an order-paid producer on `broker`.
pub fn create_default_state(
    store: Arc<dyn OrderStore>,
    store_backend: &'static str,
    broker: InMemoryBroker,
    config: &Config,
) -> Arc<AppState> {
    let orchestrator = OrderOrchestrator::new(
        store,
        InMemoryCatalogClient::with_parts(demo_parts()),
        InMemoryPaymentClient::new(),
        OrderPaidProducer::with_topic(broker, config.order_paid_topic.clone()),
    );

    Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
        request_timeout: config.request_timeout,
        store_backend,
    })
}

/// Starts the fulfillment-completed consumer as a member of the configured group.
///
/// The task ends once `shutdown` is cancelled.
pub fn spawn_completion_consumer(
    state: &AppState,
    subscriber: InMemoryBroker,
    config: &Config,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let handler: Arc<dyn MessageHandler> = Arc::new(
        FulfillmentCompletedHandler::new(Arc::clone(&state.orchestrator))
            .with_timeout(config.request_timeout),
    );
    let topic = config.fulfillment_completed_topic.clone();
    let group = config.fulfillment_consumer_group.clone();

    tokio::spawn(async move {
        if let Err(err) = subscriber.consume(&topic, &group, handler, shutdown).await {
            tracing::error!(error = %err, %topic, %group, "completion consumer failed");
        }
    })
}
