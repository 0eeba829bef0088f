//! 峰值信噪比 (PSNR).

use ndarray::{Array3, ArrayView3, Zip};

use super::{check_shape, masked_mean};
use crate::consts::{DATA_RANGE, PSNR_EPSILON};
use crate::error::MetricError;
use crate::RoiMask;

/// 整体 PSNR: `10 * log10(R^2 / MSE)`. 完全一致 (`MSE == 0`) 时为 `+inf`.
pub fn psnr(pred: ArrayView3<f32>, reference: ArrayView3<f32>) -> Result<f64, MetricError> {
    check_shape(reference.dim(), pred.dim())?;
    let sq: f64 = Zip::from(&pred)
        .and(&reference)
        .fold(0.0, |acc, &p, &r| acc + (p as f64 - r as f64).powi(2));
    let mse = sq / pred.len() as f64;
    if mse == 0.0 {
        Ok(f64::INFINITY)
    } else {
        Ok(10.0 * (DATA_RANGE * DATA_RANGE / mse).log10())
    }
}

/// 逐体素 PSNR 图: `10 * log10(R^2 / (e^2 + 1e-8))`.
pub fn psnr_map(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
) -> Result<Array3<f64>, MetricError> {
    check_shape(reference.dim(), pred.dim())?;
    Ok(Zip::from(&pred).and(&reference).map_collect(|&p, &r| {
        let sq = (p as f64 - r as f64).powi(2);
        10.0 * (DATA_RANGE * DATA_RANGE / (sq + PSNR_EPSILON)).log10()
    }))
}

/// 掩膜 PSNR: 逐体素 PSNR 图在掩膜前景上的均值.
///
/// 注意这与整体 PSNR 不同: 前者是 dB 值的均值, 后者是均方误差的对数.
/// 只有误差在空间上均匀时两者才 (近似) 相等.
pub fn psnr_masked(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
    mask: &RoiMask,
) -> Result<f64, MetricError> {
    let map = psnr_map(pred, reference)?;
    masked_mean(map.view(), mask)
}
