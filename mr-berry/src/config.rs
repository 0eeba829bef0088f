//! 评估配置.
//!
//! 挑战赛历史上出现过两套评估约定, 分别对应两个预设:
//!
//! 1. [`EvalConfig::flat`]: 平铺布局, 整体指标, 计分变体 A, 按 SSIM 排名;
//! 2. [`EvalConfig::masked`]: POCEMR 布局, 掩膜指标, 计分变体 B, 按最终得分排名.
//!
//! 开启 `serde` feature 后也可以从 JSON 文件读取. 文件中未出现的字段取
//! [`EvalConfig::flat`] 的值.

use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::aggregate::{NonFinitePolicy, ScoreAggregator, ScoreWeights, ScoringVariant};
use crate::consts::modality;
use crate::dataset::Layout;
use crate::error::ConfigError;
use crate::leaderboard::RankKey;
use crate::metrics::Region;
use crate::VolumeFormat;

/// 一次评估的完整配置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvalConfig {
    /// 参赛者提交根目录. 其下每个子目录对应一个参赛者.
    pub submission_dir: PathBuf,

    /// 真值根目录.
    pub reference_dir: PathBuf,

    /// 掩膜根目录. 仅 [`Region::Masked`] 需要.
    pub mask_dir: Option<PathBuf>,

    /// 文件布局.
    pub layout: Layout,

    /// 参与评估的受试者编号, 按评估顺序排列.
    pub subjects: Vec<u32>,

    /// 参与评估的模态, 按评估顺序排列.
    pub modalities: Vec<String>,

    /// 生成掩膜所用的模态. 每个受试者只加载一次掩膜, 用于该受试者的全部模态.
    pub mask_modality: String,

    /// 体数据文件扩展名, 含前导 `.`.
    pub extension: String,

    /// 指标作用区域.
    pub region: Region,

    /// 计分约定.
    pub scoring: ScoringVariant,

    /// 最终得分权重.
    pub weights: ScoreWeights,

    /// 非有限指标值处理策略.
    pub non_finite: NonFinitePolicy,

    /// 排名依据.
    pub rank_by: RankKey,
}

impl Default for EvalConfig {
    #[inline]
    fn default() -> Self {
        Self::flat()
    }
}

impl EvalConfig {
    /// 平铺布局预设. 目录为空, 需要调用方填写.
    pub fn flat() -> Self {
        let layout = Layout::Flat;
        Self {
            submission_dir: PathBuf::new(),
            reference_dir: PathBuf::new(),
            mask_dir: None,
            subjects: layout.default_subjects(),
            layout,
            modalities: modality::ALL.map(String::from).to_vec(),
            mask_modality: modality::T1.to_owned(),
            extension: ".nii.gz".to_owned(),
            region: Region::Whole,
            scoring: ScoringVariant::RawPsnr,
            weights: ScoreWeights::default(),
            non_finite: NonFinitePolicy::Cap,
            rank_by: RankKey::Ssim,
        }
    }

    /// POCEMR 掩膜预设. 目录为空, 需要调用方填写.
    pub fn masked() -> Self {
        let layout = Layout::pocemr();
        Self {
            subjects: layout.default_subjects(),
            layout,
            region: Region::Masked,
            scoring: ScoringVariant::psnr_ceiling(),
            rank_by: RankKey::FinalScore,
            ..Self::flat()
        }
    }

    /// 由配置得到指标汇总器.
    #[inline]
    pub fn aggregator(&self) -> ScoreAggregator {
        ScoreAggregator::new(self.scoring)
            .with_weights(self.weights)
            .with_policy(self.non_finite)
    }

    /// 检查配置是否自洽. 不检查目录是否存在.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(msg.into()))
        }

        if self.submission_dir.as_os_str().is_empty() {
            return invalid("submission_dir is empty");
        }
        if self.reference_dir.as_os_str().is_empty() {
            return invalid("reference_dir is empty");
        }
        if self.region == Region::Masked && self.mask_dir.is_none() {
            return invalid("masked evaluation requires mask_dir");
        }
        if self.subjects.is_empty() {
            return invalid("no subject to evaluate");
        }
        if self.modalities.is_empty() {
            return invalid("no modality to evaluate");
        }
        if let Some(s) = self.subjects.iter().duplicates().next() {
            return invalid(format!("subject {s} is listed more than once"));
        }
        if let Some(m) = self.modalities.iter().duplicates().next() {
            return invalid(format!("modality `{m}` is listed more than once"));
        }
        if self.mask_modality.is_empty() {
            return invalid("mask_modality is empty");
        }
        if VolumeFormat::from_path(Path::new(&format!("volume{}", self.extension))).is_none() {
            return invalid(format!("unsupported extension `{}`", self.extension));
        }
        if let Layout::Nested { prefix, .. } = &self.layout {
            if prefix.is_empty() {
                return invalid("nested layout requires a subject prefix");
            }
        }
        if let ScoringVariant::PsnrCeiling { max_psnr } = self.scoring {
            if !(max_psnr.is_finite() && max_psnr > 0.0) {
                return invalid(format!("max_psnr must be positive, got {max_psnr}"));
            }
        }
        let w = &self.weights;
        if ![w.ssim, w.psnr, w.mae, w.nmse].iter().all(|v| v.is_finite()) {
            return invalid("score weights must be finite");
        }
        Ok(())
    }

    /// 从 JSON 文件读取配置.
    #[cfg(feature = "serde")]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })
    }

    /// 写出为 JSON 文件.
    #[cfg(feature = "serde")]
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })
    }
}
