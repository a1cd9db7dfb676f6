//! 記事の真偽分類（TF-IDF + ロジスティック回帰）。
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod artifact;
pub mod features;
pub mod model;
pub mod tokenizer;

pub use artifact::{ArtifactError, FittedPipeline, PipelineError, TrainedArtifact};
pub use features::{ExtractorError, FeatureVector, TfidfExtractor, Vocabulary, VocabularyConfig};
pub use model::{ClassProbabilities, ClassifierError, LogisticRegression, ModelParameters, SolverConfig};

/// タイトルと本文を結合する区切り。
pub const FEATURE_SEPARATOR: &str = " [SEP] ";

/// 記事ラベル。整数表現は `0 = fake`, `1 = real`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Label {
    Fake = 0,
    Real = 1,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid label {0}: expected 0 (fake) or 1 (real)")]
pub struct InvalidLabel(pub u8);

impl Label {
    pub const ALL: [Label; 2] = [Label::Fake, Label::Real];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fake => "fake",
            Self::Real => "real",
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Fake => 0,
            Self::Real => 1,
        }
    }

    /// ロジスティック損失で用いる符号（real を正例とする）。
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Fake => -1.0,
            Self::Real => 1.0,
        }
    }
}

impl TryFrom<u8> for Label {
    type Error = InvalidLabel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Fake),
            1 => Ok(Self::Real),
            other => Err(InvalidLabel(other)),
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        match label {
            Label::Fake => 0,
            Label::Real => 1,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分類器へ入力するテキスト `title [SEP] text` を組み立てる。欠損は空文字として扱う。
#[must_use]
pub fn feature_text(title: Option<&str>, text: Option<&str>) -> String {
    format!(
        "{}{FEATURE_SEPARATOR}{}",
        title.unwrap_or_default(),
        text.unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Label::Fake)]
    #[case(1, Label::Real)]
    fn label_round_trips_integer_convention(#[case] raw: u8, #[case] expected: Label) {
        assert_eq!(Label::try_from(raw), Ok(expected));
        assert_eq!(u8::from(expected), raw);
    }

    #[test]
    fn label_rejects_other_integers() {
        assert_eq!(Label::try_from(2), Err(InvalidLabel(2)));
        assert!(serde_json::from_str::<Label>("7").is_err());
    }

    #[test]
    fn feature_text_fills_missing_fields() {
        assert_eq!(feature_text(Some("T"), Some("body")), "T [SEP] body");
        assert_eq!(feature_text(None, Some("body")), " [SEP] body");
        assert_eq!(feature_text(Some("T"), None), "T [SEP] ");
    }
}
