//! L2 正則化ロジスティック回帰（双対座標降下法）。
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Label;
use super::features::FeatureVector;

pub const DEFAULT_C: f64 = 1.0;
pub const DEFAULT_MAX_ITER: usize = 500;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
pub const DEFAULT_SOLVER_SEED: u64 = 0;

const MAX_INNER_ITER: usize = 100;
const INNER_ETA: f64 = 0.1;

#[derive(Debug, Error, PartialEq)]
pub enum ClassifierError {
    #[error("classifier is not fitted")]
    NotFitted,
    #[error("degenerate training set: only label {present} is present")]
    DegenerateTrainingSet { present: Label },
    #[error("degenerate training set: no samples")]
    EmptyTrainingSet,
    #[error("empty vocabulary: no feature survived document frequency filtering")]
    EmptyVocabulary,
    #[error("feature count {features} does not match label count {labels}")]
    LengthMismatch { features: usize, labels: usize },
    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// ソルバー設定。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// 正則化強度の逆数。
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    /// 座標の巡回順序を決める乱数シード。
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            c: DEFAULT_C,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            seed: DEFAULT_SOLVER_SEED,
        }
    }
}

impl SolverConfig {
    #[must_use]
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }
}

/// 学習済みの重みとバイアス。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl ModelParameters {
    #[must_use]
    pub fn dim(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn decision(&self, features: &FeatureVector) -> f64 {
        features.dot_dense(&self.weights) + self.bias
    }
}

#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// クラス確率 `(p_fake, p_real)`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub fake: f64,
    pub real: f64,
}

impl ClassProbabilities {
    #[must_use]
    pub fn from_decision(z: f64) -> Self {
        let real = sigmoid(z);
        Self {
            fake: 1.0 - real,
            real,
        }
    }

    #[must_use]
    pub fn label(&self) -> Label {
        if self.real >= 0.5 {
            Label::Real
        } else {
            Label::Fake
        }
    }
}

/// 二値ロジスティック回帰。バイアスは定数特徴 1 として重みと同様に正則化される。
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    config: SolverConfig,
    parameters: Option<ModelParameters>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl LogisticRegression {
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            parameters: None,
        }
    }

    #[must_use]
    pub fn from_parameters(parameters: ModelParameters) -> Self {
        Self {
            config: SolverConfig::default(),
            parameters: Some(parameters),
        }
    }

    #[must_use]
    pub fn parameters(&self) -> Option<&ModelParameters> {
        self.parameters.as_ref()
    }

    /// 学習を行いパラメータを返す。
    ///
    /// # Errors
    /// ラベルが片方のクラスしか含まない場合は [`ClassifierError::DegenerateTrainingSet`]、
    /// 特徴次元が 0 の場合は [`ClassifierError::EmptyVocabulary`] を返す。
    pub fn fit(
        &mut self,
        features: &[FeatureVector],
        labels: &[Label],
    ) -> Result<&ModelParameters, ClassifierError> {
        if features.len() != labels.len() {
            return Err(ClassifierError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        let Some(first) = labels.first().copied() else {
            return Err(ClassifierError::EmptyTrainingSet);
        };
        if labels.iter().all(|label| *label == first) {
            return Err(ClassifierError::DegenerateTrainingSet { present: first });
        }
        let dim = features[0].dim();
        if dim == 0 {
            return Err(ClassifierError::EmptyVocabulary);
        }
        if let Some(bad) = features.iter().find(|vector| vector.dim() != dim) {
            return Err(ClassifierError::DimensionMismatch {
                expected: dim,
                actual: bad.dim(),
            });
        }

        let parameters = solve_dual(features, labels, dim, &self.config);
        Ok(self.parameters.insert(parameters))
    }

    /// `(p_fake, p_real)` を入力順に返す。
    ///
    /// # Errors
    /// 未学習、または特徴次元が一致しない場合はエラーを返す。
    pub fn predict_proba(
        &self,
        features: &[FeatureVector],
    ) -> Result<Vec<ClassProbabilities>, ClassifierError> {
        let parameters = self
            .parameters
            .as_ref()
            .ok_or(ClassifierError::NotFitted)?;
        features
            .iter()
            .map(|vector| {
                if vector.dim() != parameters.dim() {
                    return Err(ClassifierError::DimensionMismatch {
                        expected: parameters.dim(),
                        actual: vector.dim(),
                    });
                }
                Ok(ClassProbabilities::from_decision(
                    parameters.decision(vector),
                ))
            })
            .collect()
    }

    /// # Errors
    /// `predict_proba` と同じ。
    pub fn predict(&self, features: &[FeatureVector]) -> Result<Vec<Label>, ClassifierError> {
        Ok(self
            .predict_proba(features)?
            .iter()
            .map(ClassProbabilities::label)
            .collect())
    }
}

/// 双対問題
/// `min_a 0.5 a^T Q a + sum a_i ln a_i + (C - a_i) ln(C - a_i)`, `0 < a_i < C`
/// を座標ごとのニュートン法で解く。`w = sum a_i y_i x_i`。
#[allow(clippy::many_single_char_names, clippy::similar_names)]
fn solve_dual(
    features: &[FeatureVector],
    labels: &[Label],
    dim: usize,
    config: &SolverConfig,
) -> ModelParameters {
    let n = features.len();
    let c = config.c;
    let ys: Vec<f64> = labels.iter().map(|label| label.sign()).collect();
    // squared norm of the bias-augmented sample
    let xtx: Vec<f64> = features.iter().map(|x| x.squared_norm() + 1.0).collect();

    let initial = (1e-3 * c).min(1e-8);
    let mut alpha = vec![0.0; 2 * n];
    let mut weights = vec![0.0; dim];
    let mut bias = 0.0;
    for i in 0..n {
        alpha[2 * i] = initial;
        alpha[2 * i + 1] = c - initial;
        for (idx, value) in features[i].iter() {
            weights[idx] += ys[i] * initial * value;
        }
        bias += ys[i] * initial;
    }

    let eps = config.tolerance;
    let inner_eps_min = eps.min(1e-8);
    let mut inner_eps = 1e-2;
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        order.shuffle(&mut rng);
        let mut newton_iterations = 0;
        let mut g_max: f64 = 0.0;

        for &i in &order {
            let y = ys[i];
            let a = xtx[i];
            let b = y * (features[i].dot_dense(&weights) + bias);

            let (mut ind1, mut ind2, mut sign) = (2 * i, 2 * i + 1, 1.0);
            if 0.5 * a * (alpha[ind2] - alpha[ind1]) + b < 0.0 {
                ind1 = 2 * i + 1;
                ind2 = 2 * i;
                sign = -1.0;
            }

            let alpha_old = alpha[ind1];
            let mut z = alpha_old;
            if c - z < 0.5 * c {
                z *= 0.1;
            }
            let mut gp = a * (z - alpha_old) + sign * b + (z / (c - z)).ln();
            g_max = g_max.max(gp.abs());

            let mut inner = 0;
            while inner <= MAX_INNER_ITER {
                if gp.abs() < inner_eps {
                    break;
                }
                let gpp = a + c / (c - z) / z;
                let candidate = z - gp / gpp;
                if candidate <= 0.0 {
                    z *= INNER_ETA;
                } else {
                    z = candidate;
                }
                gp = a * (z - alpha_old) + sign * b + (z / (c - z)).ln();
                newton_iterations += 1;
                inner += 1;
            }

            if inner > 0 {
                alpha[ind1] = z;
                alpha[ind2] = c - z;
                let step = sign * (z - alpha_old) * y;
                for (idx, value) in features[i].iter() {
                    weights[idx] += step * value;
                }
                bias += step;
            }
        }

        iterations += 1;
        if g_max < eps {
            converged = true;
            break;
        }
        if newton_iterations <= n / 10 {
            inner_eps = inner_eps_min.max(0.1 * inner_eps);
        }
    }

    if converged {
        tracing::debug!(iterations, "logistic regression converged");
    } else {
        tracing::warn!(
            iterations,
            max_iter = config.max_iter,
            "logistic regression reached the iteration cap before converging"
        );
    }

    ModelParameters { weights, bias }
}
