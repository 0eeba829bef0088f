//! 相似度与误差指标.
//!
//! 四种指标都作用于两个形状相同、已归一化的体数据 `pred` 与 `reference`.
//! 每种指标都有整体版本和掩膜版本.
//!
//! 掩膜版本的计算顺序固定为: 先在 **未掩膜** 的体数据上求出稠密的逐体素图,
//! 再只在掩膜前景上求均值 ([`masked_mean`]). 不要先把输入乘以掩膜:
//! 那样会破坏 SSIM 窗口在掩膜边界处的统计量.

use ndarray::{ArrayView3, Zip};

use crate::error::MetricError;
use crate::{Idx3d, RoiMask};

pub mod mae;
pub mod nmse;
pub mod psnr;
pub mod ssim;

/// 指标种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Metric {
    /// 结构相似度.
    Ssim,
    /// 峰值信噪比.
    Psnr,
    /// 平均绝对误差.
    Mae,
    /// 归一化均方误差.
    Nmse,
}

impl Metric {
    /// 全部指标, 按报表列顺序排列.
    pub const ALL: [Metric; 4] = [Self::Ssim, Self::Psnr, Self::Mae, Self::Nmse];

    /// 报表中的列名.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ssim => "SSIM",
            Self::Psnr => "PSNR",
            Self::Mae => "MAE",
            Self::Nmse => "NMSE",
        }
    }
}

/// 指标作用区域.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Region {
    /// 整个体数据.
    #[default]
    Whole,
    /// 仅掩膜前景.
    Masked,
}

/// 一个样本 (参赛者 × 受试者 × 模态) 的四项指标.
///
/// 整体 PSNR 在完全一致时为 `+inf`; 整体 NMSE 在参考体数据能量为 0 时为 `+inf`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MetricSample {
    /// 结构相似度.
    pub ssim: f64,
    /// 峰值信噪比 (dB).
    pub psnr: f64,
    /// 平均绝对误差.
    pub mae: f64,
    /// 归一化均方误差.
    pub nmse: f64,
}

impl MetricSample {
    /// 按指标种类取值.
    #[inline]
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Ssim => self.ssim,
            Metric::Psnr => self.psnr,
            Metric::Mae => self.mae,
            Metric::Nmse => self.nmse,
        }
    }
}

/// 检查两个形状是否一致.
#[inline]
pub(crate) fn check_shape(expected: Idx3d, found: Idx3d) -> Result<(), MetricError> {
    if expected == found {
        Ok(())
    } else {
        Err(MetricError::ShapeMismatch { expected, found })
    }
}

/// 只在掩膜前景上对逐体素图求均值: `sum(map * mask) / count_nonzero(mask)`.
///
/// 掩膜外的值 (即使是 NaN 或 inf) 不参与计算. 掩膜为空时返回
/// [`MetricError::EmptyMask`].
pub fn masked_mean(map: ArrayView3<f64>, mask: &RoiMask) -> Result<f64, MetricError> {
    check_shape(map.dim(), mask.shape())?;
    let (sum, count) = Zip::from(&map)
        .and(&mask.data())
        .fold((0.0f64, 0usize), |(sum, count), &v, &m| {
            if m != 0 {
                (sum + v, count + 1)
            } else {
                (sum, count)
            }
        });
    if count == 0 {
        Err(MetricError::EmptyMask)
    } else {
        Ok(sum / count as f64)
    }
}

/// 计算整体版本的四项指标.
pub fn evaluate(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
) -> Result<MetricSample, MetricError> {
    check_shape(reference.dim(), pred.dim())?;
    Ok(MetricSample {
        ssim: ssim::ssim(pred, reference)?,
        psnr: psnr::psnr(pred, reference)?,
        mae: mae::mae(pred, reference)?,
        nmse: nmse::nmse(pred, reference)?,
    })
}

/// 计算掩膜版本的四项指标.
pub fn evaluate_masked(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
    mask: &RoiMask,
) -> Result<MetricSample, MetricError> {
    check_shape(reference.dim(), pred.dim())?;
    check_shape(reference.dim(), mask.shape())?;
    if mask.is_empty() {
        return Err(MetricError::EmptyMask);
    }
    Ok(MetricSample {
        ssim: ssim::ssim_masked(pred, reference, mask)?,
        psnr: psnr::psnr_masked(pred, reference, mask)?,
        mae: mae::mae_masked(pred, reference, mask)?,
        nmse: nmse::nmse_masked(pred, reference, mask)?,
    })
}
