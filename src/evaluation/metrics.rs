use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classification::Label;

#[derive(Debug, Error)]
pub enum MetricsWriteError {
    #[error("failed to write metrics record to {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize metrics record")]
    Serialize(#[from] serde_json::Error),
}

/// 評価1回分の記録。品質ゲートの入力になる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub precision_macro: f64,
    #[serde(default)]
    pub recall_macro: f64,
    #[serde(default)]
    pub f1_macro: f64,
    /// `[actual][predicted]` の件数。
    #[serde(default)]
    pub confusion_matrix: [[u64; 2]; 2],
    #[serde(default)]
    pub n_test: usize,
}

impl MetricsRecord {
    /// 整形済み JSON として書き出す。
    ///
    /// # Errors
    /// 書き込みに失敗した場合は [`MetricsWriteError`] を返す。
    pub fn save(&self, path: &Path) -> Result<(), MetricsWriteError> {
        let io_error = |source| MetricsWriteError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload).map_err(io_error)?;
        Ok(())
    }
}

/// クラス別の適合率・再現率・F1。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassReport {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// 2x2 混同行列。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[u64; 2]; 2],
}

impl ConfusionMatrix {
    /// # Panics
    /// `actual` と `predicted` の長さが異なる場合。
    #[must_use]
    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Self {
        assert_eq!(
            actual.len(),
            predicted.len(),
            "actual and predicted labels must have the same length"
        );
        let mut matrix = Self::default();
        for (expected, got) in actual.iter().zip(predicted) {
            matrix.push(*expected, *got);
        }
        matrix
    }

    pub fn push(&mut self, actual: Label, predicted: Label) {
        self.counts[actual.index()][predicted.index()] += 1;
    }

    #[must_use]
    pub fn counts(&self) -> [[u64; 2]; 2] {
        self.counts
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    #[must_use]
    pub fn correct(&self) -> u64 {
        self.counts[0][0] + self.counts[1][1]
    }

    /// クラス別の指標。分母が 0 になる値は 0 とする（エラーにはしない）。
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn class_report(&self, label: Label) -> ClassReport {
        let idx = label.index();
        let other = 1 - idx;
        let tp = self.counts[idx][idx] as f64;
        let false_pos = self.counts[other][idx] as f64;
        let false_neg = self.counts[idx][other] as f64;

        // Undefined-metric rule: a zero denominator yields 0.0.
        let precision = if tp + false_pos > 0.0 {
            tp / (tp + false_pos)
        } else {
            0.0
        };
        let recall = if tp + false_neg > 0.0 {
            tp / (tp + false_neg)
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        ClassReport {
            label,
            precision,
            recall,
            f1,
            support: self.counts[idx].iter().sum(),
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn to_record(&self) -> MetricsRecord {
        let reports = Label::ALL.map(|label| self.class_report(label));
        let classes = reports.len() as f64;
        let total = self.total();
        let accuracy = if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        };

        MetricsRecord {
            accuracy,
            precision_macro: reports.iter().map(|r| r.precision).sum::<f64>() / classes,
            recall_macro: reports.iter().map(|r| r.recall).sum::<f64>() / classes,
            f1_macro: reports.iter().map(|r| r.f1).sum::<f64>() / classes,
            confusion_matrix: self.counts,
            n_test: total as usize,
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>8} {:>8}", "", "pred_fake", "pred_real")?;
        for label in Label::ALL {
            let row = self.counts[label.index()];
            writeln!(f, "{:>12} {:>8} {:>8}", label.as_str(), row[0], row[1])?;
        }
        Ok(())
    }
}
