//! 评估流程.
//!
//! 对每个参赛者目录, 按 `受试者 × 模态` 的顺序依次执行
//! 加载 → 归一化 → (掩膜) → 指标, 累积到 [`ParticipantSamples`]; 参赛者遍历完后
//! 一次性定稿为 [`ParticipantRecord`], 最后排序为 [`LeaderboardTable`].
//!
//! # 注意
//!
//! 1. 任何单个样本的失败都不会中断评估: 失败会被报告给诊断接收者,
//!   该样本记为不可用, 然后继续下一个样本.
//! 2. 没有任何成功样本的参赛者不出现在排行榜中.
//! 3. 开启 `rayon` feature 时按参赛者并行, 排行榜与串行结果完全一致.
//! 4. 掩膜只与受试者有关, 在 [`Evaluator::run`] 开始时每个受试者加载一次,
//!   由全部参赛者共享.
//! 5. 每个样本计算 SSIM 时约需 9 个与体数据同形状的 `f64` 临时数组.
//!   并行时峰值内存约为 `线程数 x 体素数 x 72` 字节, 可用 rayon 线程数限制.

use std::io;

use ndarray::{ArrayView3, Zip};

use crate::aggregate::{ParticipantRecord, ParticipantSamples, ScoreAggregator};
use crate::config::EvalConfig;
use crate::dataset::{self, Participant};
use crate::diag::{Diagnostics, SampleKey};
use crate::error::SampleError;
use crate::leaderboard::LeaderboardTable;
use crate::metrics::{self, MetricSample, Region};
use crate::normalize::Normalization;
use crate::{MrVolume, RoiMask, VolumeLoader};

/// 掩膜相关诊断事件中代替参赛者的标识.
const MASK_OWNER: &str = "masks";

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 单个样本的评估结果.
///
/// 不可用与 "得分为 0" 必须区分开, 因此不可用时不携带任何数值.
#[derive(Debug)]
pub enum SampleOutcome {
    /// 四项指标全部计算成功.
    Scored(MetricSample),

    /// 样本不可用.
    Unavailable(SampleError),
}

impl SampleOutcome {
    /// 成功时返回指标.
    #[inline]
    pub fn sample(&self) -> Option<&MetricSample> {
        match self {
            Self::Scored(s) => Some(s),
            Self::Unavailable(_) => None,
        }
    }
}

/// 评估器.
pub struct Evaluator<'d> {
    config: EvalConfig,
    aggregator: ScoreAggregator,
    diag: &'d dyn Diagnostics,
}

impl<'d> Evaluator<'d> {
    /// 初始化. 不检查配置, 需要时请先调用 [`EvalConfig::validate`].
    pub fn new(config: EvalConfig, diag: &'d dyn Diagnostics) -> Self {
        Self {
            aggregator: config.aggregator(),
            config,
            diag,
        }
    }

    /// 当前配置.
    #[inline]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    #[inline]
    fn loader(&self) -> VolumeLoader<'d> {
        VolumeLoader::new(self.diag)
    }

    /// 列出提交根目录下的参赛者, 按目录名字典序排列.
    #[inline]
    pub fn participants(&self) -> io::Result<Vec<Participant>> {
        dataset::list_participants(&self.config.submission_dir)
    }

    /// 评估全部参赛者并生成排行榜.
    ///
    /// 提交根目录无法读取时报告错误, 并返回空排行榜.
    /// 并行时同时评估的参赛者个数不超过 rayon 线程数.
    pub fn run(&self) -> LeaderboardTable {
        let participants = match self.participants() {
            Ok(p) => p,
            Err(e) => {
                self.diag.error(
                    None,
                    format!(
                        "cannot list submissions under `{}`: {e}",
                        self.config.submission_dir.display()
                    ),
                );
                Vec::new()
            }
        };
        self.diag.info(
            None,
            format!("evaluating {} participant(s)", participants.len()),
        );
        let masks = if participants.is_empty() {
            Vec::new()
        } else {
            self.load_masks()
        };

        #[cfg(feature = "rayon")]
        let records: Vec<Option<ParticipantRecord>> = participants
            .par_iter()
            .map(|p| self.evaluate_participant(p, &masks))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let records: Vec<Option<ParticipantRecord>> = participants
            .iter()
            .map(|p| self.evaluate_participant(p, &masks))
            .collect();

        LeaderboardTable::new(self.config.rank_by, records.into_iter().flatten().collect())
    }

    /// 加载全部受试者的掩膜, 与 [`EvalConfig::subjects`] 按下标一一对应.
    ///
    /// 整体评估时返回空表. 加载失败的受试者对应 `None`.
    pub fn load_masks(&self) -> Vec<Option<RoiMask>> {
        match self.config.region {
            Region::Whole => Vec::new(),
            Region::Masked => self
                .config
                .subjects
                .iter()
                .map(|&subject| self.subject_mask(subject))
                .collect(),
        }
    }

    /// 评估单个参赛者. `masks` 来自 [`Evaluator::load_masks`].
    /// 没有任何成功样本时返回 `None`.
    pub fn evaluate_participant(
        &self,
        participant: &Participant,
        masks: &[Option<RoiMask>],
    ) -> Option<ParticipantRecord> {
        let mut samples = ParticipantSamples::new(participant.id.as_str());

        for (i, subject) in self.config.subjects.iter().copied().enumerate() {
            let mask = match self.config.region {
                Region::Whole => None,
                Region::Masked => match masks.get(i).and_then(Option::as_ref) {
                    Some(mask) => Some(mask),
                    None => {
                        for _ in &self.config.modalities {
                            samples.mark_unavailable();
                        }
                        continue;
                    }
                },
            };
            for modality in &self.config.modalities {
                match self.evaluate_sample(participant, subject, modality, mask) {
                    SampleOutcome::Scored(s) => samples.push(s),
                    SampleOutcome::Unavailable(_) => samples.mark_unavailable(),
                }
            }
        }

        let (scored, unavailable) = (samples.scored(), samples.unavailable());
        let record = self.aggregator.finalize(samples);
        match &record {
            Some(r) => self.diag.info(
                None,
                format!(
                    "{}: {scored} sample(s) scored, {unavailable} unavailable, final score {}",
                    r.id(),
                    r.final_score()
                        .map_or_else(|| "n/a".to_owned(), |v| format!("{v:.4}"))
                ),
            ),
            None => self.diag.warn(
                None,
                format!("{}: no valid sample, left off the leaderboard", participant.id),
            ),
        }
        record
    }

    /// 加载某受试者的掩膜. 失败 (包括配置中没有掩膜目录) 时返回 `None`.
    fn subject_mask(&self, subject: u32) -> Option<RoiMask> {
        let key = SampleKey::new(MASK_OWNER, subject, self.config.mask_modality.as_str());
        let Some(mask_dir) = &self.config.mask_dir else {
            self.diag
                .error(Some(&key), "no mask directory configured".to_owned());
            return None;
        };
        let path = self.config.layout.mask_path(
            mask_dir,
            subject,
            &self.config.mask_modality,
            &self.config.extension,
        );
        let mask = self.loader().load_mask(&path, &key).ok()?;
        self.diag.info(
            Some(&key),
            format!(
                "mask covers {} voxel(s), {:.2}% of the volume",
                mask.count(),
                mask.coverage() * 100.0
            ),
        );
        Some(mask)
    }

    /// 评估单个样本.
    ///
    /// `mask` 仅在 [`Region::Masked`] 时使用; 此时为 `None` 则样本不可用.
    pub fn evaluate_sample(
        &self,
        participant: &Participant,
        subject: u32,
        modality: &str,
        mask: Option<&RoiMask>,
    ) -> SampleOutcome {
        let key = SampleKey::new(participant.id.as_str(), subject, modality);
        match self.try_sample(participant, subject, modality, mask, &key) {
            Ok(s) => {
                self.diag.info(
                    Some(&key),
                    format!(
                        "SSIM: {:.4}, PSNR: {:.4}, MAE: {:.4}, NMSE: {:.4}",
                        s.ssim, s.psnr, s.mae, s.nmse
                    ),
                );
                SampleOutcome::Scored(s)
            }
            Err(e) => {
                // 加载失败已由加载器报告.
                if !matches!(e, SampleError::Load(_)) {
                    self.diag.error(Some(&key), format!("sample unavailable: {e}"));
                }
                SampleOutcome::Unavailable(e)
            }
        }
    }

    fn try_sample(
        &self,
        participant: &Participant,
        subject: u32,
        modality: &str,
        mask: Option<&RoiMask>,
        key: &SampleKey,
    ) -> Result<MetricSample, SampleError> {
        let c = &self.config;
        let loader = self.loader();
        let sub_path = c
            .layout
            .submission_path(&participant.dir, subject, modality, &c.extension);
        let ref_path = c
            .layout
            .reference_path(&c.reference_dir, subject, modality, &c.extension);
        let mut pred = loader.load(&sub_path, key, "submission")?;
        let mut reference = loader.load(&ref_path, key, "reference")?;

        if let (Some(a), Some(b)) = (pred.pix_dim(), reference.pix_dim()) {
            if a != b {
                self.diag.warn(
                    Some(key),
                    format!("voxel spacing differs: submission {a:?}, reference {b:?}"),
                );
            }
        }

        self.normalize(&mut pred, key, "submission");
        self.normalize(&mut reference, key, "reference");

        let sample = match c.region {
            Region::Whole => metrics::evaluate(pred.data(), reference.data())?,
            Region::Masked => {
                let mask = mask.ok_or(SampleError::MaskUnavailable(subject))?;
                metrics::evaluate_masked(pred.data(), reference.data(), mask)?
            }
        };

        if reference_energy(reference.data(), mask.filter(|_| c.region == Region::Masked)) <= 0.0 {
            self.diag.warn(
                Some(key),
                "reference has zero mean square, NMSE is degenerate".to_owned(),
            );
        }
        Ok(sample)
    }

    fn normalize(&self, volume: &mut MrVolume, key: &SampleKey, what: &str) {
        match volume.normalize() {
            Normalization::Scaled { non_finite, .. } if non_finite > 0 => self.diag.warn(
                Some(key),
                format!("{non_finite} non-finite voxel(s) in {what} set to zero"),
            ),
            Normalization::Scaled { .. } => {}
            Normalization::Constant(v) => self.diag.warn(
                Some(key),
                format!("degenerate {what} volume: constant intensity {v}, normalized to zeros"),
            ),
            Normalization::NoFiniteVoxel => self.diag.warn(
                Some(key),
                format!("degenerate {what} volume: no finite voxel, normalized to zeros"),
            ),
        }
    }
}

/// 参考体数据 (掩膜内) 的能量之和. 只用于判断是否退化.
fn reference_energy(reference: ArrayView3<f32>, mask: Option<&RoiMask>) -> f64 {
    match mask {
        None => reference.iter().map(|&r| (r as f64).powi(2)).sum(),
        Some(mask) => Zip::from(&reference)
            .and(&mask.data())
            .fold(0.0, |acc, &r, &m| {
                if m != 0 {
                    acc + (r as f64).powi(2)
                } else {
                    acc
                }
            }),
    }
}
