pub(crate) mod metrics;
pub(crate) mod tracing;

use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, Registry, TextEncoder};

pub use self::metrics::Metrics;
pub use self::tracing::init as init_tracing;

/// Telemetry（メトリクスとトレーシング）を管理する構造体。
#[derive(Debug, Clone)]
pub struct Telemetry {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// 新しいTelemetryインスタンスを作成し、トレーシングとメトリクスを初期化する。
    ///
    /// # Errors
    /// サブスクライバ初期化またはメトリクス登録に失敗した場合はエラーを返す。
    pub fn new() -> Result<Self> {
        tracing::init()?;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(Arc::clone(&registry))?);
        Ok(Self { registry, metrics })
    }

    /// メトリクスへのアクセスを提供する。
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// 共有用のハンドル。
    #[must_use]
    pub fn metrics_handle(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// 準備完了プローブを記録する。
    pub fn record_ready_probe(&self, ready: bool) {
        ::tracing::debug!(ready, "service ready probe");
    }

    /// 保持しているレジストリを Prometheus テキスト形式で書き出す。
    ///
    /// # Errors
    /// エンコードに失敗した場合はエラーを返す。
    pub fn render_prometheus(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("failed to encode prometheus metrics")?;
        String::from_utf8(buffer).context("prometheus output is not UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metrics() {
        let telemetry = Telemetry::new().expect("telemetry");
        telemetry.metrics().predict_requests.inc();
        let rendered = telemetry.render_prometheus().expect("render");
        assert!(rendered.contains("fake_news_predict_requests_total 1"));
        assert!(rendered.contains("fake_news_model_loaded"));
    }
}
