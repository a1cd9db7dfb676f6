//! 保存済みアーティファクトをテーブル末尾の固定ホールドアウトで再評価する。
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{Evaluation, evaluate, log_report};
use crate::classification::{FittedPipeline, Label, TrainedArtifact};
use crate::dataset::NewsRecord;

/// テーブル末尾をホールドアウトとする割合。
pub const HOLDOUT_FRACTION: f64 = 0.2;

/// 先頭 `floor(n * (1 - fraction))` 件を除いた末尾を返す（順序は保つ）。
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn tail_holdout(records: &[NewsRecord], fraction: f64) -> &[NewsRecord] {
    let keep = (records.len() as f64 * (1.0 - fraction)).floor() as usize;
    &records[keep.min(records.len())..]
}

/// アーティファクトを読み込み、ホールドアウトで評価する。
///
/// # Errors
/// アーティファクトが存在しない・壊れている場合や推論に失敗した場合はエラーを返す。
pub fn evaluate_artifact(model_path: &Path, records: &[NewsRecord]) -> Result<Evaluation> {
    let artifact = TrainedArtifact::load(model_path)?;
    let pipeline = FittedPipeline::from_artifact(artifact)?;

    let holdout = tail_holdout(records, HOLDOUT_FRACTION);
    let texts = holdout
        .iter()
        .map(NewsRecord::feature_text)
        .collect::<Vec<_>>();
    let labels = holdout.iter().map(|r| r.label).collect::<Vec<Label>>();

    info!(
        total = records.len(),
        holdout = holdout.len(),
        "evaluating persisted artifact on tail holdout"
    );
    let evaluation =
        evaluate(&pipeline, &texts, &labels).context("failed to evaluate holdout split")?;
    log_report("holdout", &evaluation);
    Ok(evaluation)
}
