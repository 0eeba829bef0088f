//! 平均绝对误差 (MAE).

use ndarray::{Array3, ArrayView3, Zip};

use super::{check_shape, masked_mean};
use crate::error::MetricError;
use crate::RoiMask;

/// 逐体素绝对误差图 `|pred - reference|`.
pub fn abs_error_map(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
) -> Result<Array3<f64>, MetricError> {
    check_shape(reference.dim(), pred.dim())?;
    Ok(Zip::from(&pred)
        .and(&reference)
        .map_collect(|&p, &r| (p as f64 - r as f64).abs()))
}

/// 整体 MAE.
pub fn mae(pred: ArrayView3<f32>, reference: ArrayView3<f32>) -> Result<f64, MetricError> {
    let map = abs_error_map(pred, reference)?;
    Ok(map.sum() / map.len() as f64)
}

/// 掩膜 MAE: 绝对误差图在掩膜前景上的均值. 不做截断.
pub fn mae_masked(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
    mask: &RoiMask,
) -> Result<f64, MetricError> {
    let map = abs_error_map(pred, reference)?;
    masked_mean(map.view(), mask)
}
