use std::sync::Arc;

use anyhow::Result;
use axum::Router;

use crate::{api, config::Config, observability::Telemetry, service::ModelService};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    telemetry: Telemetry,
    model_service: Arc<ModelService>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn model_service(&self) -> &ModelService {
        &self.registry.model_service
    }
}

impl ComponentRegistry {
    /// 構成情報から Telemetry と推論サービスを組み立てる。モデルはまだ読み込まない。
    ///
    /// # Errors
    /// Telemetry の初期化が失敗した場合はエラーを返す。
    pub fn build(config: &Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        let model_service = Arc::new(ModelService::new(
            config.model_path().clone(),
            telemetry.metrics_handle(),
        ));
        Ok(Self {
            telemetry,
            model_service,
        })
    }

    /// 既存の推論サービスを差し込んで組み立てる。
    #[must_use]
    pub fn with_model_service(telemetry: Telemetry, model_service: ModelService) -> Self {
        Self {
            telemetry,
            model_service: Arc::new(model_service),
        }
    }

    #[must_use]
    pub fn model_service(&self) -> Arc<ModelService> {
        Arc::clone(&self.model_service)
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    api::router(state)
}
