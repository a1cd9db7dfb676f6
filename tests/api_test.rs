/// HTTP tests for the inference API.
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use fake_news_detector::{
    app::{ComponentRegistry, build_router},
    classification::{FittedPipeline, ModelParameters, TrainedArtifact},
    observability::Telemetry,
    service::ModelService,
};

fn artifact() -> TrainedArtifact {
    TrainedArtifact {
        vocabulary: vec!["hoax".into(), "official".into(), "report".into()],
        idf: vec![1.2, 1.1, 1.3],
        parameters: ModelParameters {
            weights: vec![-6.0, 4.0, 3.0],
            bias: 0.1,
        },
    }
}

fn router_with(service: impl FnOnce(&Telemetry) -> ModelService) -> Router {
    let telemetry = Telemetry::new().expect("telemetry");
    let model_service = service(&telemetry);
    build_router(ComponentRegistry::with_model_service(telemetry, model_service))
}

fn loaded_router() -> Router {
    router_with(|telemetry| {
        let pipeline = FittedPipeline::from_artifact(artifact()).expect("pipeline");
        ModelService::with_pipeline(pipeline, telemetry.metrics_handle())
    })
}

fn predict_request(body: impl Into<Body>) -> Request<Body> {
    Request::post("/predict")
        .header("content-type", "application/json")
        .body(body.into())
        .expect("request builds")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json body")
}

#[tokio::test]
async fn test_health_reports_ok_once_loaded() {
    let response = loaded_router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_predict_preserves_order_and_probability_contract() {
    let texts = vec![
        "official report [SEP] published today",
        "hoax hoax",
        "words outside the vocabulary",
    ];
    let response = loaded_router()
        .oneshot(predict_request(json!({ "texts": texts }).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let items = body.as_array().expect("array response");
    assert_eq!(items.len(), texts.len());
    for (item, text) in items.iter().zip(&texts) {
        assert_eq!(item["text"], *text);
        let prob_fake = item["prob_fake"].as_f64().expect("prob_fake");
        let prob_real = item["prob_real"].as_f64().expect("prob_real");
        assert!((prob_fake + prob_real - 1.0).abs() < 1e-6);
        let label = item["label"].as_u64().expect("label");
        assert_eq!(label == 1, prob_real >= 0.5);
        assert_eq!(item["label_name"], if label == 1 { "real" } else { "fake" });
    }
    assert_eq!(items[0]["label_name"], "real");
    assert_eq!(items[1]["label_name"], "fake");
}

#[tokio::test]
async fn test_empty_batch_returns_empty_list() {
    let response = loaded_router()
        .oneshot(predict_request(r#"{"texts": []}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn test_malformed_batch_is_rejected() {
    for payload in [r#"{"texts": [1, 2]}"#, r#"{"documents": []}"#, "not json"] {
        let response = loaded_router()
            .oneshot(predict_request(payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{payload}");
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid_request");
        assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));
    }
}

#[tokio::test]
async fn test_missing_model_is_reported_as_unavailable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model_path = dir.path().join("absent.json");
    let router = router_with(|telemetry| {
        ModelService::new(model_path.clone(), telemetry.metrics_handle())
    });

    let response = router
        .clone()
        .oneshot(predict_request(r#"{"texts": ["hoax"]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"], "model_unavailable");

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["status"], "unavailable");
}

#[tokio::test]
async fn test_metrics_endpoint_counts_requests() {
    let router = loaded_router();
    router
        .clone()
        .oneshot(predict_request(r#"{"texts": ["hoax"]}"#))
        .await
        .unwrap();

    let response = router
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("fake_news_predict_requests_total 1"));
    assert!(text.contains("fake_news_predicted_fake_total 1"));
    assert!(text.contains("fake_news_model_loaded 1"));
}
