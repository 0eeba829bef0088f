//! 强度归一化.
//!
//! 每个体数据独立地用自身的最小/最大值线性映射到 `[0, 1]`:
//! `v' = (v - min) / (max - min)`.

use ndarray::{ArrayView3, ArrayViewMut3};

/// 一次归一化的结果.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Normalization {
    /// 正常缩放.
    Scaled {
        /// 原最小值.
        min: f32,
        /// 原最大值.
        max: f32,
        /// 被置零的非有限体素 (NaN, ±inf) 个数.
        non_finite: usize,
    },

    /// 常量体数据, `max == min`. 结果全部置零.
    Constant(f32),

    /// 没有任何有限体素 (包括空数据). 结果全部置零.
    NoFiniteVoxel,
}

impl Normalization {
    /// 是否是退化情况 (结果为全零).
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !matches!(self, Self::Scaled { .. })
    }
}

/// 求有限体素的最小值与最大值. 没有有限体素时返回 `None`.
pub fn finite_min_max(data: ArrayView3<f32>) -> Option<(f32, f32)> {
    data.iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// 就地 min-max 归一化.
///
/// 1. 常量体数据或没有有限体素时, 全部置零, 并以退化结果告知调用方.
/// 2. 非有限体素在缩放后置零, 不会把 NaN 传给下游指标.
///
/// 对已经归一化到 `[0, 1]` (且取到 0 和 1) 的数据, 该操作不改变任何值.
pub fn normalize_in_place(mut data: ArrayViewMut3<f32>) -> Normalization {
    let Some((min, max)) = finite_min_max(data.view()) else {
        data.fill(0.0);
        return Normalization::NoFiniteVoxel;
    };
    if max == min {
        data.fill(0.0);
        return Normalization::Constant(min);
    }

    let lo = min as f64;
    let range = max as f64 - lo;
    let mut non_finite = 0usize;
    data.mapv_inplace(|v| {
        if v.is_finite() {
            ((v as f64 - lo) / range) as f32
        } else {
            non_finite += 1;
            0.0
        }
    });
    Normalization::Scaled {
        min,
        max,
        non_finite,
    }
}
