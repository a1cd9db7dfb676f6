//! 学習済みアーティファクトを一度だけ読み込み、推論要求に応える共有サービス。
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::classification::{ArtifactError, FittedPipeline, Label, TrainedArtifact};
use crate::observability::Metrics;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("model unavailable")]
    ModelUnavailable(#[source] ArtifactError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// 応答ボディの `error` に入れる種別名。
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// 入力1件に対する推論結果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub text: String,
    pub label: Label,
    pub label_name: String,
    pub prob_fake: f64,
    pub prob_real: f64,
}

/// プロセス内で共有する推論サービス。
///
/// アーティファクトは初回利用時（または起動時の [`ModelService::load`]）に一度だけ読み込まれ、
/// 以後は読み取り専用で参照される。同時に到着した初回要求は同じ読み込みを待つ。
#[derive(Debug)]
pub struct ModelService {
    model_path: PathBuf,
    model: OnceCell<Arc<FittedPipeline>>,
    metrics: Arc<Metrics>,
}

impl ModelService {
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>, metrics: Arc<Metrics>) -> Self {
        Self {
            model_path: model_path.into(),
            model: OnceCell::new(),
            metrics,
        }
    }

    /// 学習済みパイプラインを直接渡して構築する。
    #[must_use]
    pub fn with_pipeline(pipeline: FittedPipeline, metrics: Arc<Metrics>) -> Self {
        metrics.model_loaded.set(1.0);
        Self {
            model_path: PathBuf::new(),
            model: OnceCell::new_with(Some(Arc::new(pipeline))),
            metrics,
        }
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// アーティファクトを読み込む。読み込み済みならそれを返す。
    ///
    /// 失敗した読み込みは記録されず、次の呼び出しで再試行される。
    ///
    /// # Errors
    /// アーティファクトが存在しない・壊れている場合は [`ServiceError::ModelUnavailable`] を返す。
    pub async fn load(&self) -> Result<Arc<FittedPipeline>, ServiceError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let started = Instant::now();
                let path = self.model_path.clone();
                let loaded = tokio::task::spawn_blocking(move || {
                    TrainedArtifact::load(&path).and_then(FittedPipeline::from_artifact)
                })
                .await
                .map_err(|error| ServiceError::Internal(error.to_string()))?;

                match loaded {
                    Ok(pipeline) => {
                        self.metrics
                            .model_load_duration
                            .observe(started.elapsed().as_secs_f64());
                        self.metrics.model_loaded.set(1.0);
                        info!(
                            path = %self.model_path.display(),
                            vocabulary = pipeline.vocabulary().map_or(0, |v| v.len()),
                            "model artifact loaded"
                        );
                        Ok::<_, ServiceError>(Arc::new(pipeline))
                    }
                    Err(err) => {
                        self.metrics.model_load_failures.inc();
                        error!(
                            path = %self.model_path.display(),
                            error = %err,
                            "failed to load model artifact"
                        );
                        Err(ServiceError::ModelUnavailable(err))
                    }
                }
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// 入力順を保ったまま推論する。
    ///
    /// # Errors
    /// モデルが読み込めない場合は [`ServiceError::ModelUnavailable`]、
    /// 推論処理に失敗した場合は [`ServiceError::Internal`] を返す。
    pub async fn predict(&self, texts: Vec<String>) -> Result<Vec<Prediction>, ServiceError> {
        let pipeline = self.load().await?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let predictions = tokio::task::spawn_blocking(move || {
            let probabilities = pipeline
                .predict_proba(&texts)
                .map_err(|error| ServiceError::Internal(error.to_string()))?;
            Ok::<_, ServiceError>(
                texts
                    .into_iter()
                    .zip(probabilities)
                    .map(|(text, probs)| {
                        let label = probs.label();
                        Prediction {
                            text,
                            label,
                            label_name: label.as_str().to_string(),
                            prob_fake: probs.fake,
                            prob_real: probs.real,
                        }
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .await
        .map_err(|error| ServiceError::Internal(error.to_string()))??;

        self.metrics
            .predict_duration
            .observe(started.elapsed().as_secs_f64());
        self.metrics
            .record_predictions(predictions.iter().map(|p| p.label));
        Ok(predictions)
    }
}
