//! 評価指標・品質ゲート・保存済みモデルの再評価。
pub mod gate;
pub mod holdout;
pub mod metrics;

use tracing::info;

use crate::classification::{FittedPipeline, Label, PipelineError};

use self::metrics::{ConfusionMatrix, MetricsRecord};

/// 1 分割に対する評価結果。
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub matrix: ConfusionMatrix,
    pub record: MetricsRecord,
}

/// 学習済みパイプラインでテキストを予測し、正解ラベルと突き合わせる。
///
/// # Errors
/// 特徴抽出・推論に失敗した場合は [`PipelineError`] を返す。
pub fn evaluate<S: AsRef<str>>(
    pipeline: &FittedPipeline,
    texts: &[S],
    labels: &[Label],
) -> Result<Evaluation, PipelineError> {
    let predicted = pipeline.predict(texts)?;
    let matrix = ConfusionMatrix::from_labels(labels, &predicted);
    Ok(Evaluation {
        record: matrix.to_record(),
        matrix,
    })
}

/// 分割ごとのクラス別レポートと混同行列をログに出す。
pub fn log_report(split: &str, evaluation: &Evaluation) {
    for label in Label::ALL {
        let report = evaluation.matrix.class_report(label);
        info!(
            split,
            label = label.as_str(),
            precision = format!("{:.3}", report.precision),
            recall = format!("{:.3}", report.recall),
            f1 = format!("{:.3}", report.f1),
            support = report.support,
            "class report"
        );
    }
    info!(
        split,
        accuracy = format!("{:.3}", evaluation.record.accuracy),
        f1_macro = format!("{:.3}", evaluation.record.f1_macro),
        n = evaluation.record.n_test,
        confusion_matrix = ?evaluation.record.confusion_matrix,
        "split evaluated"
    );
}
