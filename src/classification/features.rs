//! 文書集合から語彙と IDF を学習し、TF-IDF 特徴量へ変換する。
use rustc_hash::{FxHashMap, FxHashSet};
use sprs::CsVec;
use thiserror::Error;

use super::tokenizer::{NgramRange, TermTokenizer};

pub const DEFAULT_MIN_DF: usize = 3;
pub const DEFAULT_MAX_DF: f64 = 0.9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractorError {
    #[error("feature extractor is not fitted")]
    NotFitted,
    #[error("vocabulary terms ({terms}) and idf weights ({weights}) differ in length")]
    InconsistentVocabulary { terms: usize, weights: usize },
}

/// 語彙選択の条件。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VocabularyConfig {
    /// 最低文書頻度（この件数以上の文書に出現したタームのみ採用）。
    pub min_df: usize,
    /// 最大文書頻度の割合（これを超える割合の文書に出現したタームは除外）。
    pub max_df: f64,
    pub ngrams: NgramRange,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            min_df: DEFAULT_MIN_DF,
            max_df: DEFAULT_MAX_DF,
            ngrams: NgramRange::UNI_BI,
        }
    }
}

/// 学習済み語彙と IDF 重み。学習後は変更されない。
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    terms: Vec<String>,
    idf: Vec<f64>,
    index: FxHashMap<String, usize>,
}

impl Vocabulary {
    /// 永続化された語彙から復元する。
    ///
    /// # Errors
    /// `terms` と `idf` の長さが異なる場合は [`ExtractorError::InconsistentVocabulary`] を返す。
    pub fn from_parts(terms: Vec<String>, idf: Vec<f64>) -> Result<Self, ExtractorError> {
        if terms.len() != idf.len() {
            return Err(ExtractorError::InconsistentVocabulary {
                terms: terms.len(),
                weights: idf.len(),
            });
        }
        let index = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        Ok(Self { terms, idf, index })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[must_use]
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    #[must_use]
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    #[must_use]
    pub fn contains(&self, term: &str) -> bool {
        self.index.contains_key(term)
    }
}

/// 平滑化 IDF: `ln((1 + N) / (1 + df)) + 1`。
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn smoothed_idf(total_docs: usize, doc_count: usize) -> f64 {
    ((1.0 + total_docs as f64) / (1.0 + doc_count as f64)).ln() + 1.0
}

/// L2 正規化済みの疎な特徴ベクトル。
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(CsVec<f64>);

impl FeatureVector {
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self(CsVec::empty(dim))
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.0.dim()
    }

    #[must_use]
    pub fn nnz(&self) -> usize {
        self.0.nnz()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.nnz() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.0.iter().map(|(idx, value)| (idx, *value))
    }

    #[must_use]
    pub fn squared_norm(&self) -> f64 {
        self.0.data().iter().map(|value| value * value).sum()
    }

    #[must_use]
    pub fn norm(&self) -> f64 {
        self.squared_norm().sqrt()
    }

    /// 密な重みベクトルとの内積。
    #[must_use]
    pub fn dot_dense(&self, weights: &[f64]) -> f64 {
        self.iter()
            .map(|(idx, value)| value * weights.get(idx).copied().unwrap_or(0.0))
            .sum()
    }
}

/// サブリニア TF × 平滑化 IDF の特徴抽出器。
#[derive(Debug, Clone)]
pub struct TfidfExtractor {
    config: VocabularyConfig,
    tokenizer: TermTokenizer,
    vocabulary: Option<Vocabulary>,
}

impl Default for TfidfExtractor {
    fn default() -> Self {
        Self::new(VocabularyConfig::default())
    }
}

impl TfidfExtractor {
    #[must_use]
    pub fn new(config: VocabularyConfig) -> Self {
        Self {
            config,
            tokenizer: TermTokenizer::new(config.ngrams),
            vocabulary: None,
        }
    }

    /// 学習済み語彙から抽出器を組み立てる（推論用）。
    #[must_use]
    pub fn from_vocabulary(vocabulary: Vocabulary) -> Self {
        let config = VocabularyConfig::default();
        Self {
            config,
            tokenizer: TermTokenizer::new(config.ngrams),
            vocabulary: Some(vocabulary),
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    /// コーパスから語彙と IDF を構築する。既存の語彙は置き換えられる。
    ///
    /// 空のコーパスでは空の語彙になる（エラーにはしない）。
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> &Vocabulary {
        let total_docs = documents.len();
        // term -> (document count, first occurrence order)
        let mut doc_freq: FxHashMap<String, (usize, usize)> = FxHashMap::default();

        for document in documents {
            let terms = self.tokenizer.terms(document.as_ref());
            let mut seen: FxHashSet<&str> = FxHashSet::default();
            for term in &terms {
                if !seen.insert(term.as_str()) {
                    continue;
                }
                let next_order = doc_freq.len();
                doc_freq
                    .entry(term.clone())
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, next_order));
            }
        }

        let unique_terms = doc_freq.len();
        #[allow(clippy::cast_precision_loss)]
        let max_doc_count = self.config.max_df * total_docs as f64;

        let mut retained: Vec<(String, usize, usize)> = doc_freq
            .into_iter()
            .filter(|(_, (count, _))| {
                #[allow(clippy::cast_precision_loss)]
                let within_max = *count as f64 <= max_doc_count;
                *count >= self.config.min_df && within_max
            })
            .map(|(term, (count, order))| (term, count, order))
            .collect();
        retained.sort_by(|a, b| a.2.cmp(&b.2).then_with(|| a.0.cmp(&b.0)));

        let idf = retained
            .iter()
            .map(|(_, count, _)| smoothed_idf(total_docs, *count))
            .collect::<Vec<_>>();
        let terms = retained
            .into_iter()
            .map(|(term, _, _)| term)
            .collect::<Vec<_>>();

        tracing::info!(
            total_docs,
            unique_terms,
            vocabulary_size = terms.len(),
            min_df = self.config.min_df,
            max_df = self.config.max_df,
            "tfidf vocabulary fitted"
        );

        let index = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.vocabulary.insert(Vocabulary { terms, idf, index })
    }

    /// 文書を特徴ベクトルに変換する。語彙と IDF は変更しない。
    ///
    /// # Errors
    /// `fit` 前に呼び出した場合は [`ExtractorError::NotFitted`] を返す。
    pub fn transform<S: AsRef<str>>(
        &self,
        documents: &[S],
    ) -> Result<Vec<FeatureVector>, ExtractorError> {
        let vocabulary = self.vocabulary.as_ref().ok_or(ExtractorError::NotFitted)?;
        Ok(documents
            .iter()
            .map(|document| self.vectorize(vocabulary, document.as_ref()))
            .collect())
    }

    /// `fit` と `transform` をまとめて行う。
    ///
    /// # Errors
    /// `transform` と同じ。
    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        documents: &[S],
    ) -> Result<Vec<FeatureVector>, ExtractorError> {
        self.fit(documents);
        self.transform(documents)
    }

    fn vectorize(&self, vocabulary: &Vocabulary, document: &str) -> FeatureVector {
        let mut counts: FxHashMap<usize, u32> = FxHashMap::default();
        for term in self.tokenizer.terms(document) {
            let Some(index) = vocabulary.index_of(&term) else {
                // Out-of-vocabulary rule: unseen terms are dropped, never an error.
                continue;
            };
            *counts.entry(index).or_insert(0) += 1;
        }

        let mut entries = counts.into_iter().collect::<Vec<_>>();
        entries.sort_unstable_by_key(|(index, _)| *index);

        let mut indices = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (index, count) in entries {
            let tf = 1.0 + f64::from(count).ln();
            indices.push(index);
            values.push(tf * vocabulary.idf[index]);
        }

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut values {
                *value /= norm;
            }
        }

        FeatureVector(CsVec::new(vocabulary.len(), indices, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "alpha beta gamma".to_string(),
            "alpha beta delta".to_string(),
            "alpha beta epsilon".to_string(),
            "alpha zeta".to_string(),
        ]
    }

    #[test]
    fn idf_matches_smoothed_formula() {
        assert!((smoothed_idf(4, 4) - 1.0).abs() < 1e-12);
        assert!((smoothed_idf(4, 1) - ((5.0_f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn fit_orders_terms_by_first_occurrence() {
        let mut extractor = TfidfExtractor::new(VocabularyConfig {
            min_df: 1,
            max_df: 1.0,
            ..VocabularyConfig::default()
        });
        let vocabulary = extractor.fit(&corpus());
        assert_eq!(
            &vocabulary.terms()[..4],
            &["alpha", "beta", "gamma", "alpha beta"]
        );
    }

    #[test]
    fn fit_applies_document_frequency_bounds() {
        let mut extractor = TfidfExtractor::new(VocabularyConfig {
            min_df: 3,
            max_df: 0.9,
            ..VocabularyConfig::default()
        });
        let vocabulary = extractor.fit(&corpus());
        // "alpha" is in 4/4 documents (> 0.9), "gamma" only in 1.
        assert!(!vocabulary.contains("alpha"));
        assert!(!vocabulary.contains("gamma"));
        assert!(vocabulary.contains("beta"));
        assert!(vocabulary.contains("alpha beta"));
    }

    #[test]
    fn transform_before_fit_is_rejected() {
        let extractor = TfidfExtractor::default();
        assert_eq!(
            extractor.transform(&["anything"]).unwrap_err(),
            ExtractorError::NotFitted
        );
    }

    #[test]
    fn empty_corpus_yields_empty_vocabulary() {
        let mut extractor = TfidfExtractor::default();
        let empty: Vec<String> = Vec::new();
        assert!(extractor.fit(&empty).is_empty());
        let vectors = extractor.transform(&["some text"]).expect("fitted");
        assert!(vectors[0].is_zero());
    }

    #[test]
    fn sublinear_counts_are_normalized() {
        let vocabulary =
            Vocabulary::from_parts(vec!["a1".into(), "b2".into()], vec![1.0, 1.0]).expect("vocab");
        let extractor = TfidfExtractor::from_vocabulary(vocabulary);
        let vectors = extractor.transform(&["a1 a1 a1 b2"]).expect("fitted");
        let tf_a = 1.0 + 3.0_f64.ln();
        let norm = (tf_a * tf_a + 1.0).sqrt();
        assert!((vectors[0].get(0) - tf_a / norm).abs() < 1e-12);
        assert!((vectors[0].get(1) - 1.0 / norm).abs() < 1e-12);
        assert!((vectors[0].norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inconsistent_parts_are_rejected() {
        let error = Vocabulary::from_parts(vec!["a1".into()], vec![]).unwrap_err();
        assert_eq!(
            error,
            ExtractorError::InconsistentVocabulary {
                terms: 1,
                weights: 0
            }
        );
    }
}
