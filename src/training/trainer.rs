//! 学習テーブルから学習済みアーティファクトとメトリクス記録を作る。
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{error, info, warn};

use super::split::{DEFAULT_SPLIT_SEED, SplitIndices, stratified_split};
use crate::classification::{
    ArtifactError, FittedPipeline, Label, SolverConfig, VocabularyConfig,
};
use crate::dataset::NewsRecord;
use crate::evaluation::metrics::MetricsWriteError;
use crate::evaluation::{Evaluation, evaluate, log_report};

/// 学習1回分の設定。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    pub split_seed: u64,
    pub vocabulary: VocabularyConfig,
    pub solver: SolverConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            split_seed: DEFAULT_SPLIT_SEED,
            vocabulary: VocabularyConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

/// 学習結果。validation は診断用、test がメトリクス記録になる。
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: FittedPipeline,
    pub split: SplitIndices,
    pub validation: Evaluation,
    pub test: Evaluation,
}

/// 2つの出力それぞれの永続化結果。片方の失敗がもう片方の成功を隠さない。
#[derive(Debug)]
pub struct PersistOutcome {
    pub artifact: Result<(), ArtifactError>,
    pub metrics: Result<(), MetricsWriteError>,
}

impl PersistOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.artifact.is_ok() && self.metrics.is_ok()
    }

    /// どちらかが失敗していればまとめてエラーにする。
    ///
    /// # Errors
    /// 書き出しに失敗した出力を列挙したエラーを返す。
    pub fn into_result(self) -> Result<()> {
        let mut failures = Vec::new();
        if let Err(error) = self.artifact {
            failures.push(format!("model artifact: {error:#}"));
        }
        if let Err(error) = self.metrics {
            failures.push(format!("metrics record: {error:#}"));
        }
        if failures.is_empty() {
            Ok(())
        } else {
            bail!("failed to persist {}", failures.join("; "))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    #[must_use]
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// 分割・学習・評価を行う。学習は train 分割のみを使う。
    ///
    /// # Errors
    /// 学習データが退化している場合や推論に失敗した場合はエラーを返す。
    pub fn run(&self, records: &[NewsRecord]) -> Result<TrainingOutcome> {
        let started = Instant::now();
        let texts = records
            .iter()
            .map(NewsRecord::feature_text)
            .collect::<Vec<_>>();
        let labels = records.iter().map(|r| r.label).collect::<Vec<Label>>();

        let split = stratified_split(&labels, self.config.split_seed);
        info!(
            rows = records.len(),
            train = split.train.len(),
            validation = split.validation.len(),
            test = split.test.len(),
            seed = self.config.split_seed,
            "dataset split"
        );

        let (train_texts, train_labels) = gather(&texts, &labels, &split.train);
        let pipeline = FittedPipeline::fit(
            &train_texts,
            &train_labels,
            self.config.vocabulary,
            self.config.solver,
        )
        .context("failed to fit pipeline on train split")?;
        info!(
            vocabulary = pipeline.vocabulary().map_or(0, |v| v.len()),
            "pipeline fitted"
        );

        let (val_texts, val_labels) = gather(&texts, &labels, &split.validation);
        let validation = evaluate(&pipeline, &val_texts, &val_labels)
            .context("failed to evaluate validation split")?;
        log_report("validation", &validation);

        let (test_texts, test_labels) = gather(&texts, &labels, &split.test);
        let test = evaluate(&pipeline, &test_texts, &test_labels)
            .context("failed to evaluate test split")?;
        log_report("test", &test);

        info!(
            elapsed_ms = started.elapsed().as_millis(),
            "training run finished"
        );
        Ok(TrainingOutcome {
            pipeline,
            split,
            validation,
            test,
        })
    }
}

fn gather<'a>(
    texts: &'a [String],
    labels: &[Label],
    indices: &[usize],
) -> (Vec<&'a str>, Vec<Label>) {
    indices
        .iter()
        .map(|&idx| (texts[idx].as_str(), labels[idx]))
        .unzip()
}

/// アーティファクトとメトリクス記録をそれぞれ独立に書き出す。
pub fn persist(outcome: &TrainingOutcome, model_path: &Path, metrics_path: &Path) -> PersistOutcome {
    let artifact = outcome
        .pipeline
        .to_artifact()
        .map_err(|error| ArtifactError::Invalid(error.to_string()))
        .and_then(|artifact| artifact.save(model_path));
    match &artifact {
        Ok(()) => info!(path = %model_path.display(), "model artifact saved"),
        Err(err) => error!(path = %model_path.display(), error = %err, "failed to save model artifact"),
    }

    let metrics = outcome.test.record.save(metrics_path);
    match &metrics {
        Ok(()) => info!(path = %metrics_path.display(), "metrics record saved"),
        Err(err) => error!(path = %metrics_path.display(), error = %err, "failed to save metrics record"),
    }

    if artifact.is_ok() != metrics.is_ok() {
        warn!("training outputs persisted partially");
    }
    PersistOutcome { artifact, metrics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::gate::load_metrics;

    fn corpus() -> Vec<NewsRecord> {
        (0..40)
            .map(|i| {
                let (label, cue) = if i % 2 == 0 {
                    (Label::Fake, "hoax hoax shocking")
                } else {
                    (Label::Real, "official statement confirmed")
                };
                NewsRecord {
                    news_id: i.to_string(),
                    label,
                    title: Some(format!("headline {cue}")),
                    text: Some(format!("{cue} story number{i} body text")),
                    source: "test".into(),
                }
            })
            .collect()
    }

    #[test]
    fn run_separates_cue_words_on_test_split() {
        let outcome = Trainer::default().run(&corpus()).expect("train");
        assert_eq!(outcome.split.len(), 40);
        assert_eq!(outcome.test.record.n_test, outcome.split.test.len());
        assert!((outcome.test.record.accuracy - 1.0).abs() < 1e-12);
        assert!((outcome.validation.record.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn run_fails_on_single_class_table() {
        let records = corpus()
            .into_iter()
            .filter(|r| r.label == Label::Real)
            .collect::<Vec<_>>();
        assert!(Trainer::default().run(&records).is_err());
    }

    #[test]
    fn persist_writes_both_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = Trainer::default().run(&corpus()).expect("train");
        let model_path = dir.path().join("models").join("model.json");
        let metrics_path = dir.path().join("metrics.json");

        let persisted = persist(&outcome, &model_path, &metrics_path);
        assert!(persisted.is_complete());
        assert_eq!(load_metrics(&metrics_path).expect("metrics"), outcome.test.record);
        assert!(model_path.exists());
    }

    #[test]
    fn failed_artifact_write_does_not_hide_metrics_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = Trainer::default().run(&corpus()).expect("train");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").expect("write");
        let metrics_path = dir.path().join("metrics.json");

        let persisted = persist(&outcome, &blocker.join("model.json"), &metrics_path);
        assert!(persisted.artifact.is_err());
        assert!(persisted.metrics.is_ok());
        assert!(metrics_path.exists());
        let message = persisted.into_result().unwrap_err().to_string();
        assert!(message.contains("model artifact"));
        assert!(!message.contains("metrics record"));
    }
}
