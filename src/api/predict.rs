use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::service::{Prediction, ServiceError};

#[derive(Debug, Deserialize)]
pub(crate) struct PredictRequest {
    texts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    detail: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.kind(),
            detail: format!("{:#}", anyhow::Error::new(self)),
        };
        (status, Json(body)).into_response()
    }
}

/// POST /predict
/// 入力テキストごとに `{text, label, label_name, prob_fake, prob_real}` を入力順で返す。
pub(crate) async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Vec<Prediction>>, ServiceError> {
    let metrics = state.telemetry().metrics();
    metrics.predict_requests.inc();

    let Json(request) = payload.map_err(|rejection| {
        metrics.predict_rejected.inc();
        warn!(error = %rejection.body_text(), "rejected malformed prediction request");
        ServiceError::InvalidRequest(rejection.body_text())
    })?;

    let count = request.texts.len();
    match state.model_service().predict(request.texts).await {
        Ok(predictions) => {
            info!(documents = count, "prediction batch served");
            Ok(Json(predictions))
        }
        Err(err) => {
            error!(error = %err, documents = count, "prediction batch failed");
            Err(err)
        }
    }
}
