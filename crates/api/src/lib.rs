//! HTTP API server with observability for the storefront.
//!
//! Provides REST endpoints for the catalog, the shopper's cart and orders,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::{CartService, CatalogService, OrderService, SessionIdentity};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub cart: CartService<S>,
    pub orders: OrderService<S>,
    pub catalog: CatalogService<S>,
    /// The backing store, for seeding catalog rows and sessions. Handlers
    /// go through the services.
    pub store: S,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/categories", get(routes::catalog::categories::<S>))
        .route("/products", get(routes::catalog::list::<S>))
        .route("/products/featured", get(routes::catalog::featured::<S>))
        .route("/products/search", get(routes::catalog::search::<S>))
        .route("/products/price-range", get(routes::catalog::price_range::<S>))
        .route("/products/{id}", get(routes::catalog::get::<S>))
        .route(
            "/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/items", post(routes::cart::add::<S>))
        .route(
            "/cart/items/{id}",
            patch(routes::cart::update::<S>).delete(routes::cart::remove::<S>),
        )
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/reorder", post(routes::orders::reorder::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state, wiring every service to one store.
pub fn create_default_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    let identity = Arc::new(SessionIdentity::new(store.clone()));
    let cart = CartService::new(store.clone(), identity);
    let orders = OrderService::new(cart.clone());
    let catalog = CatalogService::new(store.clone());

    Arc::new(AppState {
        cart,
        orders,
        catalog,
        store,
    })
}
