pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod predict;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::ready))
        .route("/predict", post(predict::predict))
        .route("/metrics", get(metrics::exporter))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
