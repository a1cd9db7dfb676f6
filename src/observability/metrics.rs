/// Prometheusメトリクス定義。
use prometheus::{
    Counter, Gauge, Histogram, Registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

use crate::classification::Label;

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub predict_requests: Counter,
    pub predict_rejected: Counter,
    pub predicted_fake: Counter,
    pub predicted_real: Counter,
    pub model_load_failures: Counter,

    // ヒストグラム
    pub predict_duration: Histogram,
    pub model_load_duration: Histogram,

    // ゲージ
    pub model_loaded: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    ///
    /// # Errors
    /// 同名のメトリクスが登録済みの場合はエラーを返す。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            predict_requests: register_counter_with_registry!(
                "fake_news_predict_requests_total",
                "Total number of prediction requests",
                registry
            )?,
            predict_rejected: register_counter_with_registry!(
                "fake_news_predict_rejected_total",
                "Total number of rejected prediction requests",
                registry
            )?,
            predicted_fake: register_counter_with_registry!(
                "fake_news_predicted_fake_total",
                "Total number of documents predicted as fake",
                registry
            )?,
            predicted_real: register_counter_with_registry!(
                "fake_news_predicted_real_total",
                "Total number of documents predicted as real",
                registry
            )?,
            model_load_failures: register_counter_with_registry!(
                "fake_news_model_load_failures_total",
                "Total number of failed model loads",
                registry
            )?,
            predict_duration: register_histogram_with_registry!(
                "fake_news_predict_duration_seconds",
                "Duration of a prediction batch",
                registry
            )?,
            model_load_duration: register_histogram_with_registry!(
                "fake_news_model_load_duration_seconds",
                "Duration of model artifact loading",
                registry
            )?,
            model_loaded: register_gauge_with_registry!(
                "fake_news_model_loaded",
                "Whether the model artifact is loaded (1) or not (0)",
                registry
            )?,
        })
    }

    /// 予測ラベルごとの件数を加算する。
    pub fn record_predictions(&self, labels: impl IntoIterator<Item = Label>) {
        for label in labels {
            match label {
                Label::Fake => self.predicted_fake.inc(),
                Label::Real => self.predicted_real.inc(),
            }
        }
    }
}
