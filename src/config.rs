use std::{env, net::SocketAddr, num::NonZeroUsize, path::PathBuf};

use thiserror::Error;

use crate::classification::{SolverConfig, VocabularyConfig, tokenizer::NgramRange};
use crate::evaluation::gate::GateThresholds;
use crate::training::TrainingConfig;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    dataset_path: PathBuf,
    raw_dir: PathBuf,
    model_path: PathBuf,
    metrics_path: PathBuf,
    holdout_metrics_path: PathBuf,
    split_seed: u64,
    min_df: usize,
    max_df: f64,
    regularization_c: f64,
    max_iter: NonZeroUsize,
    gate_min_f1: f64,
    gate_min_accuracy: f64,
    eager_load: bool,
    min_words: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から設定値を読み込み、検証する。未設定の値は既定値になる。
    ///
    /// # Errors
    /// 数値／アドレスのパースや範囲検証に失敗した場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_bind = parse_socket_addr("FAKE_NEWS_HTTP_BIND", "0.0.0.0:8000")?;
        let dataset_path = parse_path(
            "FAKE_NEWS_DATASET_PATH",
            "data/processed/politifact_articles.jsonl",
        );
        let raw_dir = parse_path("FAKE_NEWS_RAW_DIR", "data/raw/politifact_articles");
        let model_path = parse_path("FAKE_NEWS_MODEL_PATH", "models/baseline_tfidf_logreg.json");
        let metrics_path = parse_path("FAKE_NEWS_METRICS_PATH", "metrics_baseline.json");
        let holdout_metrics_path =
            parse_path("FAKE_NEWS_HOLDOUT_METRICS_PATH", "metrics_holdout.json");
        if holdout_metrics_path == metrics_path {
            return Err(ConfigError::Invalid {
                name: "FAKE_NEWS_HOLDOUT_METRICS_PATH",
                source: anyhow::anyhow!("must differ from FAKE_NEWS_METRICS_PATH"),
            });
        }
        let split_seed = parse_u64("FAKE_NEWS_SPLIT_SEED", crate::training::split::DEFAULT_SPLIT_SEED)?;
        let min_df = parse_usize(
            "FAKE_NEWS_MIN_DF",
            crate::classification::features::DEFAULT_MIN_DF,
        )?;
        let max_df = parse_fraction(
            "FAKE_NEWS_MAX_DF",
            crate::classification::features::DEFAULT_MAX_DF,
        )?;
        let regularization_c = parse_positive_f64(
            "FAKE_NEWS_REGULARIZATION_C",
            crate::classification::model::DEFAULT_C,
        )?;
        let max_iter = parse_non_zero_usize(
            "FAKE_NEWS_MAX_ITER",
            crate::classification::model::DEFAULT_MAX_ITER,
        )?;
        let gate_min_f1 = parse_f64(
            "FAKE_NEWS_GATE_MIN_F1",
            crate::evaluation::gate::DEFAULT_MIN_F1_MACRO,
        )?;
        let gate_min_accuracy = parse_f64(
            "FAKE_NEWS_GATE_MIN_ACCURACY",
            crate::evaluation::gate::DEFAULT_MIN_ACCURACY,
        )?;
        let eager_load = parse_bool("FAKE_NEWS_EAGER_LOAD", true)?;
        let min_words = parse_usize("FAKE_NEWS_MIN_WORDS", crate::dataset::DEFAULT_MIN_WORDS)?;

        Ok(Self {
            http_bind,
            dataset_path,
            raw_dir,
            model_path,
            metrics_path,
            holdout_metrics_path,
            split_seed,
            min_df,
            max_df,
            regularization_c,
            max_iter,
            gate_min_f1,
            gate_min_accuracy,
            eager_load,
            min_words,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn dataset_path(&self) -> &PathBuf {
        &self.dataset_path
    }

    #[must_use]
    pub fn raw_dir(&self) -> &PathBuf {
        &self.raw_dir
    }

    #[must_use]
    pub fn model_path(&self) -> &PathBuf {
        &self.model_path
    }

    #[must_use]
    pub fn metrics_path(&self) -> &PathBuf {
        &self.metrics_path
    }

    /// テーブル末尾ホールドアウトの評価結果の書き出し先。
    #[must_use]
    pub fn holdout_metrics_path(&self) -> &PathBuf {
        &self.holdout_metrics_path
    }

    #[must_use]
    pub fn split_seed(&self) -> u64 {
        self.split_seed
    }

    #[must_use]
    pub fn eager_load(&self) -> bool {
        self.eager_load
    }

    #[must_use]
    pub fn min_words(&self) -> usize {
        self.min_words
    }

    #[must_use]
    pub fn vocabulary_config(&self) -> VocabularyConfig {
        VocabularyConfig {
            min_df: self.min_df,
            max_df: self.max_df,
            ngrams: NgramRange::UNI_BI,
        }
    }

    #[must_use]
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            max_iter: self.max_iter.get(),
            ..SolverConfig::default().with_c(self.regularization_c)
        }
    }

    #[must_use]
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            split_seed: self.split_seed,
            vocabulary: self.vocabulary_config(),
            solver: self.solver_config(),
        }
    }

    #[must_use]
    pub fn gate_thresholds(&self) -> GateThresholds {
        GateThresholds {
            min_f1_macro: self.gate_min_f1,
            min_accuracy: self.gate_min_accuracy,
        }
    }
}

fn parse_path(name: &'static str, default: &str) -> PathBuf {
    env::var(name)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .map_or_else(|| PathBuf::from(default), PathBuf::from)
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let parsed = parse_usize(name, default)?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_positive_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let parsed = parse_f64(name, default)?;
    if parsed.is_finite() && parsed > 0.0 {
        Ok(parsed)
    } else {
        Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be a positive number"),
        })
    }
}

fn parse_fraction(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let parsed = parse_f64(name, default)?;
    if parsed > 0.0 && parsed <= 1.0 {
        Ok(parsed)
    } else {
        Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be in (0, 1]"),
        })
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}
