use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct HealthReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl HealthReport {
    fn ok() -> Self {
        Self {
            status: "ok",
            detail: None,
        }
    }

    fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            status: "unavailable",
            detail: Some(detail.into()),
        }
    }
}

/// GET /health
/// モデルが読み込まれていれば ok。未読み込みならここで読み込みを試みる。
pub(crate) async fn ready(
    State(state): State<AppState>,
) -> Result<Json<HealthReport>, (StatusCode, Json<HealthReport>)> {
    let result = state.model_service().load().await;
    state.telemetry().record_ready_probe(result.is_ok());

    match result {
        Ok(_) => Ok(Json(HealthReport::ok())),
        Err(error) => {
            warn!(error = %error, "readiness check failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport::unavailable(format!("{error:#}"))),
            ))
        }
    }
}
