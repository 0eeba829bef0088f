//! 按参赛者汇总指标, 并计算加权最终得分.
//!
//! 两种计分约定:
//!
//! 1. [`ScoringVariant::RawPsnr`]:
//!   `0.7 * SSIM + 0.1 * PSNR + 0.1 * (1 - MAE) + 0.1 * (1 - NMSE)`, PSNR 以 dB 原值参与.
//! 2. [`ScoringVariant::PsnrCeiling`]:
//!   `0.7 * SSIM + 0.1 * (PSNR / MAX_PSNR) + 0.1 * (1 - MAE) + 0.1 * (1 - NMSE)`.
//!
//! 两者数值差异很大, 每次评估只能选其一.

use crate::consts::{MAX_PSNR, NMSE_CEILING, PSNR_CAP};
use crate::metrics::{Metric, MetricSample};

impl Metric {
    /// 在按 [`Metric::ALL`] 排列的数组中的下标.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Ssim => 0,
            Self::Psnr => 1,
            Self::Mae => 2,
            Self::Nmse => 3,
        }
    }
}

/// 最终得分中各指标的权重.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreWeights {
    /// SSIM 权重.
    pub ssim: f64,
    /// PSNR 项权重.
    pub psnr: f64,
    /// `1 - MAE` 项权重.
    pub mae: f64,
    /// `1 - NMSE` 项权重.
    pub nmse: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ssim: 0.7,
            psnr: 0.1,
            mae: 0.1,
            nmse: 0.1,
        }
    }
}

/// PSNR 参与最终得分的方式.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ScoringVariant {
    /// PSNR 以 dB 原值参与.
    RawPsnr,

    /// PSNR 先除以上限再参与.
    PsnrCeiling {
        /// PSNR 上限 (dB).
        max_psnr: f64,
    },
}

impl ScoringVariant {
    /// 以默认上限 [`MAX_PSNR`] 缩放 PSNR 的变体.
    #[inline]
    pub const fn psnr_ceiling() -> Self {
        Self::PsnrCeiling { max_psnr: MAX_PSNR }
    }

    /// PSNR 在最终得分中的取值.
    #[inline]
    pub fn psnr_term(&self, psnr: f64) -> f64 {
        match self {
            Self::RawPsnr => psnr,
            Self::PsnrCeiling { max_psnr } => psnr / max_psnr,
        }
    }
}

/// 非有限指标值 (NaN, ±inf) 的处理方式.
///
/// NaN 在任何策略下都会被剔除.
///
/// 整体 PSNR 为 `+inf` 表示提交与真值完全一致, 默认按 [`NonFinitePolicy::Cap`] 计入均值.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NonFinitePolicy {
    /// 从该指标的均值中剔除, 并计数.
    Exclude,

    /// `+inf` 的 PSNR 截断为 [`PSNR_CAP`], `+inf` 的 NMSE 截断为 [`NMSE_CEILING`].
    /// 其余非有限值剔除.
    #[default]
    Cap,
}

impl NonFinitePolicy {
    /// 按策略处理单个指标值. 返回 `None` 表示剔除.
    pub fn admit(&self, metric: Metric, v: f64) -> Option<f64> {
        if v.is_finite() {
            return Some(v);
        }
        match (self, metric) {
            (Self::Cap, Metric::Psnr) if v == f64::INFINITY => Some(PSNR_CAP),
            (Self::Cap, Metric::Nmse) if v == f64::INFINITY => Some(NMSE_CEILING),
            _ => None,
        }
    }
}

/// 单个指标的均值.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MetricMean {
    /// 均值. 没有任何可用值时为 `None`.
    pub value: Option<f64>,

    /// 参与均值的样本数.
    pub used: usize,

    /// 被剔除的非有限样本数.
    pub dropped: usize,
}

/// 一个参赛者的样本累积器. 评估循环中不断追加, 完成后交给
/// [`ScoreAggregator::finalize`] 一次性定稿.
#[derive(Clone, Debug)]
pub struct ParticipantSamples {
    id: String,
    values: [Vec<f64>; 4],
    unavailable: usize,
}

impl ParticipantSamples {
    /// 初始化.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Default::default(),
            unavailable: 0,
        }
    }

    /// 参赛者标识.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 追加一个成功计算的样本.
    pub fn push(&mut self, sample: MetricSample) {
        for metric in Metric::ALL {
            self.values[metric.index()].push(sample.get(metric));
        }
    }

    /// 记录一个不可用的样本 (加载或计算失败).
    #[inline]
    pub fn mark_unavailable(&mut self) {
        self.unavailable += 1;
    }

    /// 成功计算的样本个数.
    #[inline]
    pub fn scored(&self) -> usize {
        self.values[0].len()
    }

    /// 不可用的样本个数.
    #[inline]
    pub fn unavailable(&self) -> usize {
        self.unavailable
    }

    /// 是否没有任何成功计算的样本.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scored() == 0
    }
}

/// 定稿后的参赛者记录. 创建后不可修改.
#[derive(Clone, Debug)]
pub struct ParticipantRecord {
    id: String,
    values: [Vec<f64>; 4],
    means: [MetricMean; 4],
    final_score: Option<f64>,
    unavailable: usize,
}

impl ParticipantRecord {
    /// 参赛者标识.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 某指标的全部样本值, 按评估顺序排列.
    #[inline]
    pub fn values(&self, metric: Metric) -> &[f64] {
        &self.values[metric.index()]
    }

    /// 某指标的均值详情.
    #[inline]
    pub fn metric_mean(&self, metric: Metric) -> &MetricMean {
        &self.means[metric.index()]
    }

    /// 某指标的均值.
    #[inline]
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.metric_mean(metric).value
    }

    /// 加权最终得分. 任一指标没有可用均值时为 `None`.
    #[inline]
    pub fn final_score(&self) -> Option<f64> {
        self.final_score
    }

    /// 成功计算的样本个数.
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.values[0].len()
    }

    /// 不可用的样本个数.
    #[inline]
    pub fn unavailable(&self) -> usize {
        self.unavailable
    }
}

/// 指标汇总器.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScoreAggregator {
    /// 计分约定.
    pub variant: ScoringVariant,

    /// 权重.
    pub weights: ScoreWeights,

    /// 非有限值处理策略.
    pub policy: NonFinitePolicy,
}

impl ScoreAggregator {
    /// 以默认权重与 [`NonFinitePolicy::Cap`] 初始化.
    #[inline]
    pub fn new(variant: ScoringVariant) -> Self {
        Self {
            variant,
            weights: ScoreWeights::default(),
            policy: NonFinitePolicy::default(),
        }
    }

    /// 替换权重.
    #[inline]
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// 替换非有限值处理策略.
    #[inline]
    pub fn with_policy(mut self, policy: NonFinitePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 按策略求某指标的算术平均.
    pub fn mean_of(&self, metric: Metric, values: &[f64]) -> MetricMean {
        let mut sum = 0.0;
        let mut used = 0usize;
        for v in values.iter().filter_map(|v| self.policy.admit(metric, *v)) {
            sum += v;
            used += 1;
        }
        MetricMean {
            value: (used > 0).then(|| sum / used as f64),
            used,
            dropped: values.len() - used,
        }
    }

    /// 由四个指标均值计算加权最终得分.
    pub fn combine(&self, ssim: f64, psnr: f64, mae: f64, nmse: f64) -> f64 {
        let w = &self.weights;
        w.ssim * ssim
            + w.psnr * self.variant.psnr_term(psnr)
            + w.mae * (1.0 - mae)
            + w.nmse * (1.0 - nmse)
    }

    /// 定稿. 没有任何成功样本的参赛者返回 `None`, 不进入排行榜.
    pub fn finalize(&self, samples: ParticipantSamples) -> Option<ParticipantRecord> {
        if samples.is_empty() {
            return None;
        }
        let means = Metric::ALL.map(|m| self.mean_of(m, &samples.values[m.index()]));
        let value = |m: Metric| means[m.index()].value;
        let final_score = match (
            value(Metric::Ssim),
            value(Metric::Psnr),
            value(Metric::Mae),
            value(Metric::Nmse),
        ) {
            (Some(ssim), Some(psnr), Some(mae), Some(nmse)) => {
                Some(self.combine(ssim, psnr, mae, nmse))
            }
            _ => None,
        };
        Some(ParticipantRecord {
            id: samples.id,
            values: samples.values,
            means,
            final_score,
            unavailable: samples.unavailable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ssim: f64, psnr: f64, mae: f64, nmse: f64) -> MetricSample {
        MetricSample {
            ssim,
            psnr,
            mae,
            nmse,
        }
    }

    #[test]
    fn test_raw_psnr_weighted_sum() {
        let agg = ScoreAggregator::new(ScoringVariant::RawPsnr);
        let score = agg.combine(0.8, 30.0, 0.05, 0.02);
        // 0.56 + 3.0 + 0.095 + 0.098
        assert!((score - 3.753).abs() < 1e-12);
    }

    #[test]
    fn test_psnr_ceiling_weighted_sum() {
        let agg = ScoreAggregator::new(ScoringVariant::psnr_ceiling());
        let score = agg.combine(0.8, 32.0, 0.05, 0.02);
        assert!((score - (0.56 + 0.1 + 0.095 + 0.098)).abs() < 1e-12);
    }

    #[test]
    fn test_finalize_means() {
        let agg = ScoreAggregator::new(ScoringVariant::RawPsnr);
        let mut s = ParticipantSamples::new("team1");
        s.push(sample(0.7, 28.0, 0.06, 0.03));
        s.push(sample(0.9, 32.0, 0.04, 0.01));
        s.mark_unavailable();
        let r = agg.finalize(s).unwrap();

        assert_eq!(r.id(), "team1");
        assert_eq!(r.sample_count(), 2);
        assert_eq!(r.unavailable(), 1);
        assert_eq!(r.values(Metric::Psnr), [28.0, 32.0]);
        assert!((r.mean(Metric::Ssim).unwrap() - 0.8).abs() < 1e-12);
        assert!((r.mean(Metric::Psnr).unwrap() - 30.0).abs() < 1e-12);
        assert!((r.final_score().unwrap() - 3.753).abs() < 1e-12);
    }

    #[test]
    fn test_empty_participant_has_no_record() {
        let agg = ScoreAggregator::new(ScoringVariant::RawPsnr);
        let mut s = ParticipantSamples::new("ghost");
        s.mark_unavailable();
        assert!(s.is_empty());
        assert!(agg.finalize(s).is_none());
    }

    #[test]
    fn test_non_finite_excluded() {
        let agg =
            ScoreAggregator::new(ScoringVariant::RawPsnr).with_policy(NonFinitePolicy::Exclude);
        let m = agg.mean_of(Metric::Nmse, &[0.1, f64::INFINITY, 0.3, f64::NAN]);
        assert!((m.value.unwrap() - 0.2).abs() < 1e-12);
        assert_eq!((m.used, m.dropped), (2, 2));

        let m = agg.mean_of(Metric::Psnr, &[f64::INFINITY]);
        assert_eq!(m.value, None);
    }

    #[test]
    fn test_non_finite_capped() {
        let agg = ScoreAggregator::new(ScoringVariant::RawPsnr).with_policy(NonFinitePolicy::Cap);
        let m = agg.mean_of(Metric::Psnr, &[f64::INFINITY, 20.0]);
        assert!((m.value.unwrap() - 50.0).abs() < 1e-12);
        let m = agg.mean_of(Metric::Nmse, &[f64::INFINITY, 0.0, f64::NAN]);
        assert!((m.value.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(m.dropped, 1);
        // SSIM 不存在截断值.
        assert_eq!(agg.mean_of(Metric::Ssim, &[f64::INFINITY]).value, None);
    }

    #[test]
    fn test_unavailable_metric_gives_no_final_score() {
        let agg =
            ScoreAggregator::new(ScoringVariant::RawPsnr).with_policy(NonFinitePolicy::Exclude);
        let mut s = ParticipantSamples::new("team2");
        s.push(sample(1.0, f64::INFINITY, 0.0, 0.0));
        let r = agg.finalize(s).unwrap();
        assert_eq!(r.mean(Metric::Ssim), Some(1.0));
        assert_eq!(r.mean(Metric::Psnr), None);
        assert_eq!(r.final_score(), None);
    }

    #[test]
    fn test_perfect_psnr_is_capped_by_default() {
        let agg = ScoreAggregator::new(ScoringVariant::RawPsnr);
        assert_eq!(agg.policy, NonFinitePolicy::Cap);

        let mut s = ParticipantSamples::new("oracle");
        s.push(sample(1.0, f64::INFINITY, 0.0, 0.0));
        let r = agg.finalize(s).unwrap();
        assert_eq!(r.mean(Metric::Psnr), Some(PSNR_CAP));
        assert_eq!(r.metric_mean(Metric::Psnr).dropped, 0);
        // 0.7 + 0.1 * 80 + 0.1 + 0.1
        assert!((r.final_score().unwrap() - 8.9).abs() < 1e-12);

        // 一次完美重建不能拉低均值.
        let mixed = agg.mean_of(Metric::Psnr, &[f64::INFINITY, 20.0]);
        let steady = agg.mean_of(Metric::Psnr, &[25.0, 25.0]);
        assert!(mixed.value.unwrap() > steady.value.unwrap());
    }

    #[test]
    fn test_custom_weights() {
        let agg = ScoreAggregator::new(ScoringVariant::RawPsnr).with_weights(ScoreWeights {
            ssim: 1.0,
            psnr: 0.0,
            mae: 0.0,
            nmse: 0.0,
        });
        assert_eq!(agg.combine(0.42, 99.0, 0.5, 0.5), 0.42);
    }
}
