//! JSON ログ出力と、エンドポイントが設定されていれば OTLP へのスパン送信。
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracer, SdkTracerProvider},
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "fake-news-detector";
const DEFAULT_FILTER: &str = "info";

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// 環境変数から読み取るトレーシング設定。
#[derive(Debug, Clone, PartialEq)]
struct TracingSettings {
    filter: String,
    otlp_endpoint: Option<String>,
    sampling_ratio: f64,
}

impl TracingSettings {
    fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// `RUST_LOG`・`OTEL_EXPORTER_OTLP_ENDPOINT`・`OTEL_SAMPLING_RATIO` を解釈する。
    /// 空文字は未設定扱い、サンプリング比率は `[0, 1]` に収める。
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |value: String| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        let filter = lookup("RUST_LOG")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let otlp_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").and_then(non_empty);
        let sampling_ratio = lookup("OTEL_SAMPLING_RATIO")
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|ratio| ratio.is_finite())
            .map_or(1.0, |ratio| ratio.clamp(0.0, 1.0));

        Self {
            filter,
            otlp_endpoint,
            sampling_ratio,
        }
    }
}

/// Tracing サブスクライバを一度だけ初期化する。
///
/// エクスポーターの構築に失敗した場合は JSON ログのみで起動する。
///
/// # Errors
/// サブスクライバの登録に失敗した場合はエラーを返す。
pub fn init() -> Result<()> {
    TRACING_INIT.get_or_try_init(|| install(&TracingSettings::from_env()))?;
    Ok(())
}

fn install(settings: &TracingSettings) -> Result<()> {
    let env_filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).json();

    let (tracer, exporter_error) = match settings.otlp_endpoint.as_deref() {
        Some(endpoint) => match init_tracer(endpoint, settings.sampling_ratio) {
            Ok(tracer) => (Some(tracer), None),
            Err(error) => (None, Some(error)),
        },
        None => (None, None),
    };
    let otel_enabled = tracer.is_some();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(error) = exporter_error {
        warn!(error = %format!("{error:#}"), "OTLP exporter unavailable; logging only");
    }
    info!(
        otel_enabled,
        endpoint = settings.otlp_endpoint.as_deref().unwrap_or(""),
        sampling_ratio = settings.sampling_ratio,
        "tracing initialized"
    );
    Ok(())
}

/// OTLP エクスポーター経由でスパンを送るトレーサーを組み立てる。
fn init_tracer(endpoint: &str, sampling_ratio: f64) -> Result<SdkTracer> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("failed to build OTLP span exporter")?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", SERVICE_NAME),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::TraceIdRatioBased(sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    let tracer = provider.tracer(SERVICE_NAME);
    global::set_tracer_provider(provider);
    Ok(tracer)
}
