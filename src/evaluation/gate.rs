//! メトリクス記録に対する合否判定（副作用なし）。
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::metrics::MetricsRecord;

pub const DEFAULT_MIN_F1_MACRO: f64 = 0.75;
pub const DEFAULT_MIN_ACCURACY: f64 = 0.75;

/// メトリクス記録が読めない場合の前提条件エラー。閾値未達とは区別する。
#[derive(Debug, Error)]
pub enum GateError {
    #[error("metrics file not found: {}", path.display())]
    MetricsMissing { path: PathBuf },
    #[error("metrics file unreadable: {}", path.display())]
    MetricsUnreadable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// 判定閾値（いずれも下限を含む）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateThresholds {
    pub min_f1_macro: f64,
    pub min_accuracy: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_f1_macro: DEFAULT_MIN_F1_MACRO,
            min_accuracy: DEFAULT_MIN_ACCURACY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriterionResult {
    pub name: &'static str,
    pub observed: f64,
    pub threshold: f64,
    pub passed: bool,
}

impl fmt::Display for CriterionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            write!(
                f,
                "OK: {} {:.4} >= {}",
                self.name, self.observed, self.threshold
            )
        } else {
            write!(
                f,
                "FAIL: {} {:.4} < {}",
                self.name, self.observed, self.threshold
            )
        }
    }
}

/// 基準ごとの判定結果。
#[derive(Debug, Clone, PartialEq)]
pub struct GateReport {
    pub criteria: Vec<CriterionResult>,
}

impl GateReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.criteria.iter().all(|criterion| criterion.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CriterionResult> {
        self.criteria.iter().filter(|criterion| !criterion.passed)
    }
}

impl fmt::Display for GateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for criterion in &self.criteria {
            writeln!(f, "{criterion}")?;
        }
        if self.passed() {
            write!(f, "Metric gate passed.")
        } else {
            write!(f, "Metric gate failed.")
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QualityGate {
    thresholds: GateThresholds,
}

impl QualityGate {
    #[must_use]
    pub fn new(thresholds: GateThresholds) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub fn thresholds(&self) -> GateThresholds {
        self.thresholds
    }

    /// 全基準を個別に判定する（最初の失敗で打ち切らない）。
    #[must_use]
    pub fn evaluate(&self, record: &MetricsRecord) -> GateReport {
        let criteria = vec![
            check("f1_macro", record.f1_macro, self.thresholds.min_f1_macro),
            check("accuracy", record.accuracy, self.thresholds.min_accuracy),
        ];
        GateReport { criteria }
    }
}

fn check(name: &'static str, observed: f64, threshold: f64) -> CriterionResult {
    CriterionResult {
        name,
        observed,
        threshold,
        passed: observed >= threshold,
    }
}

/// メトリクスファイルを読み込む。欠けている項目は 0.0 として扱う。
///
/// # Errors
/// ファイルが存在しない場合は [`GateError::MetricsMissing`]、
/// 読み込みや解析に失敗した場合は [`GateError::MetricsUnreadable`] を返す。
pub fn load_metrics(path: &Path) -> Result<MetricsRecord, GateError> {
    if !path.exists() {
        return Err(GateError::MetricsMissing {
            path: path.to_path_buf(),
        });
    }
    let unreadable = |source: anyhow::Error| GateError::MetricsUnreadable {
        path: path.to_path_buf(),
        source,
    };
    let raw = fs::read_to_string(path).map_err(|error| unreadable(error.into()))?;
    serde_json::from_str(&raw).map_err(|error| unreadable(error.into()))
}
