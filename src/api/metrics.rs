use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::{app::AppState, service::ServiceError};

/// `GET /metrics`：推論サービスのカウンタとヒストグラムを Prometheus 形式で返す。
pub(crate) async fn exporter(State(state): State<AppState>) -> Response {
    match state.telemetry().render_prometheus() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(error) => ServiceError::Internal(format!("{error:#}")).into_response(),
    }
}
