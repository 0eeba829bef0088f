//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;
pub use crate::{MrVolume, RoiMask, VolumeFormat, VolumeLoader};

pub use crate::aggregate::{
    NonFinitePolicy, ParticipantRecord, ParticipantSamples, ScoreAggregator, ScoreWeights,
    ScoringVariant,
};
pub use crate::config::EvalConfig;
pub use crate::consts::{modality, DATA_RANGE, MAX_PSNR};
pub use crate::dataset::{self, home_dataset_dir_with, Layout, Participant};
pub use crate::diag::{Diagnostics, LogDiagnostics, MemoryDiagnostics, SampleKey};
pub use crate::error::{ConfigError, LoadError, MetricError, SampleError};
pub use crate::leaderboard::{LeaderboardRow, LeaderboardTable, RankKey};
pub use crate::metrics::{Metric, MetricSample, Region};
pub use crate::normalize::Normalization;
pub use crate::pipeline::{Evaluator, SampleOutcome};
