//! 特徴抽出器と分類器を束ねた学習済みアーティファクトの永続化。
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Label;
use super::features::{ExtractorError, TfidfExtractor, Vocabulary, VocabularyConfig};
use super::model::{
    ClassProbabilities, ClassifierError, LogisticRegression, ModelParameters, SolverConfig,
};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("model artifact not found at {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed to access model artifact at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model artifact at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Extractor(#[from] ExtractorError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// 永続化単位。語彙・IDF・モデルパラメータを一つにまとめる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    pub parameters: ModelParameters,
}

impl TrainedArtifact {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(ArtifactError::Invalid(format!(
                "vocabulary has {} terms but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        if self.parameters.weights.len() != self.vocabulary.len() {
            return Err(ArtifactError::Invalid(format!(
                "weight vector has {} entries for {} vocabulary terms",
                self.parameters.weights.len(),
                self.vocabulary.len()
            )));
        }
        Ok(())
    }

    /// JSON として書き出す。一時ファイルへ書いてからリネームする。
    ///
    /// # Errors
    /// ディレクトリ作成・書き込み・リネームに失敗した場合は [`ArtifactError::Io`] を返す。
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        let io_error = |source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let payload = serde_json::to_vec(self).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, payload).map_err(io_error)?;
        fs::rename(&staging, path).map_err(io_error)?;
        Ok(())
    }

    /// # Errors
    /// ファイルが存在しない場合は [`ArtifactError::Missing`]、読み込みや解析・検証に失敗した場合は対応するエラーを返す。
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::Missing {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: Self = serde_json::from_slice(&raw).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        artifact.validate()?;
        Ok(artifact)
    }
}

/// 学習済みの抽出器と分類器の合成。推論時は読み取り専用で共有される。
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    extractor: TfidfExtractor,
    classifier: LogisticRegression,
}

impl FittedPipeline {
    /// 学習データのみを用いて抽出器と分類器を順に学習する。
    ///
    /// # Errors
    /// 単一クラスや空語彙など、学習データが退化している場合はエラーを返す。
    pub fn fit<S: AsRef<str>>(
        documents: &[S],
        labels: &[Label],
        vocabulary_config: VocabularyConfig,
        solver_config: SolverConfig,
    ) -> Result<Self, PipelineError> {
        let mut extractor = TfidfExtractor::new(vocabulary_config);
        let features = extractor.fit_transform(documents)?;
        let mut classifier = LogisticRegression::new(solver_config);
        classifier.fit(&features, labels)?;
        Ok(Self {
            extractor,
            classifier,
        })
    }

    /// # Errors
    /// アーティファクトの語彙と重みが整合しない場合は [`ArtifactError::Invalid`] を返す。
    pub fn from_artifact(artifact: TrainedArtifact) -> Result<Self, ArtifactError> {
        artifact.validate()?;
        let vocabulary = Vocabulary::from_parts(artifact.vocabulary, artifact.idf)
            .map_err(|error| ArtifactError::Invalid(error.to_string()))?;
        Ok(Self {
            extractor: TfidfExtractor::from_vocabulary(vocabulary),
            classifier: LogisticRegression::from_parameters(artifact.parameters),
        })
    }

    /// # Errors
    /// 未学習のコンポーネントが含まれる場合はエラーを返す。
    pub fn to_artifact(&self) -> Result<TrainedArtifact, PipelineError> {
        let vocabulary = self.vocabulary()?;
        let parameters = self
            .classifier
            .parameters()
            .ok_or(ClassifierError::NotFitted)?;
        Ok(TrainedArtifact {
            vocabulary: vocabulary.terms().to_vec(),
            idf: vocabulary.idf().to_vec(),
            parameters: parameters.clone(),
        })
    }

    /// # Errors
    /// 抽出器が未学習の場合は [`ExtractorError::NotFitted`] を返す。
    pub fn vocabulary(&self) -> Result<&Vocabulary, PipelineError> {
        Ok(self
            .extractor
            .vocabulary()
            .ok_or(ExtractorError::NotFitted)?)
    }

    /// # Errors
    /// 特徴抽出・推論に失敗した場合はエラーを返す。
    pub fn predict_proba<S: AsRef<str>>(
        &self,
        texts: &[S],
    ) -> Result<Vec<ClassProbabilities>, PipelineError> {
        let features = self.extractor.transform(texts)?;
        Ok(self.classifier.predict_proba(&features)?)
    }

    /// # Errors
    /// `predict_proba` と同じ。
    pub fn predict<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Label>, PipelineError> {
        Ok(self
            .predict_proba(texts)?
            .iter()
            .map(ClassProbabilities::label)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_artifact() -> TrainedArtifact {
        TrainedArtifact {
            vocabulary: vec!["hoax".into(), "official".into()],
            idf: vec![1.0, 1.0],
            parameters: ModelParameters {
                weights: vec![-4.0, 4.0],
                bias: 0.0,
            },
        }
    }

    #[test]
    fn save_then_load_preserves_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("models").join("model.json");
        let artifact = tiny_artifact();
        artifact.save(&path).expect("save");
        assert_eq!(TrainedArtifact::load(&path).expect("load"), artifact);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = TrainedArtifact::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(error, ArtifactError::Missing { .. }));
    }

    #[test]
    fn from_artifact_rejects_mismatched_weights() {
        let mut artifact = tiny_artifact();
        artifact.parameters.weights.push(1.0);
        assert!(matches!(
            FittedPipeline::from_artifact(artifact),
            Err(ArtifactError::Invalid(_))
        ));
    }

    #[test]
    fn restored_pipeline_predicts_with_frozen_weights() {
        let pipeline = FittedPipeline::from_artifact(tiny_artifact()).expect("pipeline");
        let labels = pipeline
            .predict(&["hoax hoax", "official statement", "unrelated"])
            .expect("predict");
        assert_eq!(labels, vec![Label::Fake, Label::Real, Label::Real]);
    }
}
