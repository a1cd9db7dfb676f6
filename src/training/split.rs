//! シード固定の層化 train / validation / test 分割。
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::classification::Label;

pub const DEFAULT_SPLIT_SEED: u64 = 42;
/// validation + test に回す割合。
pub const HOLDOUT_RATIO: f64 = 0.2;
/// ホールドアウトのうち test に回す割合。
pub const TEST_SHARE: f64 = 0.5;

/// 元テーブルへの添字。各分割は昇順に並ぶ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    #[must_use]
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// クラスごとにシャッフルしてから 80 / 10 / 10 に切り分ける。
///
/// 各クラスの件数を `n_c` として、ホールドアウトは `round(n_c * 0.2)` 件、
/// そのうち `round(holdout * 0.5)` 件を test、残りを validation に割り当てる。
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn stratified_split(labels: &[Label], seed: u64) -> SplitIndices {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut split = SplitIndices::default();

    for class in Label::ALL {
        let mut members = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        members.shuffle(&mut rng);

        let holdout = (members.len() as f64 * HOLDOUT_RATIO).round() as usize;
        let test = (holdout as f64 * TEST_SHARE).round() as usize;

        split.test.extend_from_slice(&members[..test]);
        split.validation.extend_from_slice(&members[test..holdout]);
        split.train.extend_from_slice(&members[holdout..]);
    }

    split.train.sort_unstable();
    split.validation.sort_unstable();
    split.test.sort_unstable();
    split
}
