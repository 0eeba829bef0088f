//! 排行榜.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::aggregate::ParticipantRecord;
use crate::metrics::Metric;

/// 排名依据.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RankKey {
    /// 平均 SSIM.
    Ssim,

    /// 加权最终得分.
    #[default]
    FinalScore,
}

impl RankKey {
    /// 取记录的排名键. 不可用时为 `None`.
    #[inline]
    pub fn of(&self, record: &ParticipantRecord) -> Option<f64> {
        match self {
            Self::Ssim => record.mean(Metric::Ssim),
            Self::FinalScore => record.final_score(),
        }
    }
}

/// 按排名键降序排列的参赛者记录.
#[derive(Clone, Debug)]
pub struct LeaderboardTable {
    key: RankKey,
    records: Vec<ParticipantRecord>,
}

impl LeaderboardTable {
    /// 由遍历顺序排列的记录构建排行榜.
    ///
    /// 稳定排序: 排名键相同的记录保持原有顺序. 排名键不可用的记录排在最后.
    pub fn new(key: RankKey, mut records: Vec<ParticipantRecord>) -> Self {
        // `None < Some(_)`, 取反后 `None` 自然排在末尾.
        records.sort_by_key(|r| Reverse(key.of(r).map(OrderedFloat)));
        Self { key, records }
    }

    /// 排名依据.
    #[inline]
    pub fn key(&self) -> RankKey {
        self.key
    }

    /// 已排序的记录.
    #[inline]
    pub fn records(&self) -> &[ParticipantRecord] {
        &self.records
    }

    /// 记录条数.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否没有任何记录.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按名次导出. CSV 与 JSON 输出都由此生成.
    pub fn rows(&self) -> impl Iterator<Item = LeaderboardRow<'_>> + '_ {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| LeaderboardRow::new(i + 1, r))
    }
}

/// 排行榜的一行. 不可用的值为 `None`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LeaderboardRow<'a> {
    /// 名次, 从 1 开始.
    pub rank: usize,
    /// 参赛者.
    pub participant: &'a str,
    /// 平均 SSIM.
    pub ssim: Option<f64>,
    /// 平均 PSNR.
    pub psnr: Option<f64>,
    /// 平均 MAE.
    pub mae: Option<f64>,
    /// 平均 NMSE.
    pub nmse: Option<f64>,
    /// 最终得分.
    pub final_score: Option<f64>,
    /// 成功样本数.
    pub samples: usize,
    /// 不可用样本数.
    pub unavailable: usize,
}

impl<'a> LeaderboardRow<'a> {
    fn new(rank: usize, r: &'a ParticipantRecord) -> Self {
        Self {
            rank,
            participant: r.id(),
            ssim: r.mean(Metric::Ssim),
            psnr: r.mean(Metric::Psnr),
            mae: r.mean(Metric::Mae),
            nmse: r.mean(Metric::Nmse),
            final_score: r.final_score(),
            samples: r.sample_count(),
            unavailable: r.unavailable(),
        }
    }
}
