//! 層化分割と学習の実行。
pub mod split;
pub mod trainer;

pub use split::{SplitIndices, stratified_split};
pub use trainer::{PersistOutcome, Trainer, TrainingConfig, TrainingOutcome, persist};
