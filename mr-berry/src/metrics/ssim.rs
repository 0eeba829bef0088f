//! 3D 结构相似度 (SSIM).
//!
//! 采用常见的局部窗口协方差公式: 在每个体素周围 `W x W x W` 的均值窗口内统计
//! 均值、方差与协方差, 得到逐体素的 SSIM 图. 边界以镜像反射方式延拓
//! (`d c b a | a b c d | d c b a`), 方差与协方差使用样本协方差归一
//! `NP / (NP - 1)`, 其中 `NP = W^3`.

use ndarray::{Array3, ArrayView3, Axis, Zip};

use super::{check_shape, masked_mean};
use crate::consts::{self, DATA_RANGE};
use crate::error::MetricError;
use crate::RoiMask;

/// SSIM 参数.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SsimParams {
    /// 窗口边长, 必须是不小于 3 的奇数.
    pub win_size: usize,

    /// 亮度项稳定常数系数.
    pub k1: f64,

    /// 对比度/结构项稳定常数系数.
    pub k2: f64,

    /// 强度跨度.
    pub data_range: f64,
}

impl Default for SsimParams {
    fn default() -> Self {
        Self {
            win_size: consts::ssim::WIN_SIZE,
            k1: consts::ssim::K1,
            k2: consts::ssim::K2,
            data_range: DATA_RANGE,
        }
    }
}

/// 按镜像反射规则将越界下标折回 `[0, n)`.
#[inline]
fn reflect(j: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let j = j.rem_euclid(period);
    if j >= n {
        (period - 1 - j) as usize
    } else {
        j as usize
    }
}

/// 沿 `axis` 做边长为 `size` 的一维均值滤波 (滑动窗口求和).
fn uniform_filter_1d(src: ArrayView3<f64>, axis: Axis, size: usize) -> Array3<f64> {
    let mut out = Array3::<f64>::zeros(src.raw_dim());
    let n = src.len_of(axis);
    if n == 0 {
        return out;
    }
    let half = (size / 2) as isize;
    let norm = 1.0 / size as f64;

    for (lane, mut lane_out) in src.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        let mut acc: f64 = (-half..=half).map(|k| lane[reflect(k, n)]).sum();
        for i in 0..n {
            lane_out[i] = acc * norm;
            let leaving = reflect(i as isize - half, n);
            let entering = reflect(i as isize + half + 1, n);
            acc += lane[entering] - lane[leaving];
        }
    }
    out
}

/// 三维均值滤波. 可分离, 依次沿三个轴做一维滤波.
fn uniform_filter(src: ArrayView3<f64>, size: usize) -> Array3<f64> {
    let a = uniform_filter_1d(src, Axis(0), size);
    let b = uniform_filter_1d(a.view(), Axis(1), size);
    uniform_filter_1d(b.view(), Axis(2), size)
}

/// 以给定参数计算逐体素 SSIM 图. 结果形状与输入一致.
///
/// 计算过程中约有 9 个与输入同形状的 `f64` 数组同时存活.
pub fn ssim_map_with(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
    params: &SsimParams,
) -> Result<Array3<f64>, MetricError> {
    check_shape(reference.dim(), pred.dim())?;
    let win = params.win_size;
    if win < 3 || win % 2 == 0 {
        return Err(MetricError::InvalidWindow(win));
    }
    let (z, h, w) = pred.dim();
    if z < win || h < win || w < win {
        return Err(MetricError::VolumeTooSmall {
            shape: pred.dim(),
            window: win,
        });
    }

    let x = pred.mapv(f64::from);
    let y = reference.mapv(f64::from);

    let ux = uniform_filter(x.view(), win);
    let uy = uniform_filter(y.view(), win);
    let uxx = uniform_filter((&x * &x).view(), win);
    let uyy = uniform_filter((&y * &y).view(), win);
    let uxy = uniform_filter((&x * &y).view(), win);
    drop((x, y));

    let np = win.pow(3) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (params.k1 * params.data_range).powi(2);
    let c2 = (params.k2 * params.data_range).powi(2);

    let zip = Zip::from(&ux).and(&uy).and(&uxx).and(&uyy).and(&uxy);
    let kernel = |&ux: &f64, &uy: &f64, &uxx: &f64, &uyy: &f64, &uxy: &f64| {
        let vx = cov_norm * (uxx - ux * ux);
        let vy = cov_norm * (uyy - uy * uy);
        let vxy = cov_norm * (uxy - ux * uy);
        let a1 = 2.0 * ux * uy + c1;
        let a2 = 2.0 * vxy + c2;
        let b1 = ux * ux + uy * uy + c1;
        let b2 = vx + vy + c2;
        (a1 * a2) / (b1 * b2)
    };

    #[cfg(feature = "rayon")]
    let map = zip.par_map_collect(kernel);
    #[cfg(not(feature = "rayon"))]
    let map = zip.map_collect(kernel);
    Ok(map)
}

/// 以默认参数 (7x7x7 窗口, `K1 = 0.01`, `K2 = 0.03`, 跨度 1.0) 计算逐体素 SSIM 图.
#[inline]
pub fn ssim_map(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
) -> Result<Array3<f64>, MetricError> {
    ssim_map_with(pred, reference, &SsimParams::default())
}

/// 整体 SSIM: 完整 SSIM 图 (包括边界) 的均值.
pub fn ssim(pred: ArrayView3<f32>, reference: ArrayView3<f32>) -> Result<f64, MetricError> {
    let map = ssim_map(pred, reference)?;
    Ok(map.sum() / map.len() as f64)
}

/// 掩膜 SSIM: 在未掩膜的体数据上求出完整 SSIM 图, 再只在掩膜前景上求均值.
pub fn ssim_masked(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
    mask: &RoiMask,
) -> Result<f64, MetricError> {
    check_shape(reference.dim(), mask.shape())?;
    let map = ssim_map(pred, reference)?;
    masked_mean(map.view(), mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_utils::*;
    use ndarray::Array3;

    const SHAPE: (usize, usize, usize) = (9, 8, 10);

    #[test]
    fn test_reflect() {
        let got: Vec<usize> = (-4..8).map(|j| reflect(j, 4)).collect();
        assert_eq!(got, [3, 2, 1, 0, 0, 1, 2, 3, 3, 2, 1, 0]);
    }

    #[test]
    fn test_uniform_filter_1d_matches_naive() {
        let src = Array3::from_shape_fn((2, 3, 9), |(a, b, c)| (a * 31 + b * 7 + c * c) as f64);
        let got = uniform_filter_1d(src.view(), Axis(2), 5);
        for ((a, b, c), v) in got.indexed_iter() {
            let naive: f64 = (-2..=2)
                .map(|k| src[(a, b, reflect(c as isize + k, 9))])
                .sum::<f64>()
                / 5.0;
            assert!(approx(*v, naive, 1e-9), "({a}, {b}, {c}): {v} vs {naive}");
        }
    }

    #[test]
    fn test_uniform_filter_keeps_constant() {
        let src = Array3::from_elem(SHAPE, 0.3f64);
        let out = uniform_filter(src.view(), 7);
        assert!(out.iter().all(|v| approx(*v, 0.3, 1e-12)));
    }

    #[test]
    fn test_ssim_identical_is_one() {
        let a = phantom(SHAPE);
        let map = ssim_map(a.view(), a.view()).unwrap();
        assert!(map.iter().all(|v| approx(*v, 1.0, 1e-12)));
        assert!(approx(ssim(a.view(), a.view()).unwrap(), 1.0, 1e-12));
    }

    #[test]
    fn test_ssim_decreases_with_noise() {
        let r = phantom(SHAPE);
        let light = &r + &noise(SHAPE, 0.02);
        let heavy = &r + &noise(SHAPE, 0.3);
        let s_light = ssim(light.view(), r.view()).unwrap();
        let s_heavy = ssim(heavy.view(), r.view()).unwrap();
        assert!(s_light < 1.0);
        assert!(s_heavy < s_light);
    }

    #[test]
    fn test_ssim_is_symmetric() {
        let r = phantom(SHAPE);
        let p = &r + &noise(SHAPE, 0.1);
        let a = ssim(p.view(), r.view()).unwrap();
        let b = ssim(r.view(), p.view()).unwrap();
        assert!(approx(a, b, 1e-12));
    }

    #[test]
    fn test_masked_ssim_uses_unmasked_context() {
        // 预测只在掩膜外有误差. 掩膜内体素的窗口仍然能 "看到" 掩膜外的误差,
        // 因此掩膜 SSIM 略小于 1; 先乘掩膜再算则会得到错误的 1.
        let r = phantom(SHAPE);
        let mut p = r.clone();
        p.slice_mut(ndarray::s![.., .., 5..]).mapv_inplace(|v| 1.0 - v);
        let mut m = Array3::<u8>::zeros(SHAPE);
        m.slice_mut(ndarray::s![.., .., ..5]).fill(1);
        let mask = RoiMask::from_array(m);

        let masked = ssim_masked(p.view(), r.view(), &mask).unwrap();
        assert!(masked < 1.0);

        let pm = mask.apply(p.view());
        let rm = mask.apply(r.view());
        let premasked = ssim_masked(pm.view(), rm.view(), &mask).unwrap();
        assert!(masked < premasked);
    }

    #[test]
    fn test_small_volume_and_bad_window() {
        let a = phantom((6, 8, 8));
        assert_eq!(
            ssim(a.view(), a.view()),
            Err(MetricError::VolumeTooSmall {
                shape: (6, 8, 8),
                window: 7
            })
        );
        let params = SsimParams {
            win_size: 4,
            ..SsimParams::default()
        };
        assert_eq!(
            ssim_map_with(a.view(), a.view(), &params).unwrap_err(),
            MetricError::InvalidWindow(4)
        );
        let params = SsimParams {
            win_size: 5,
            ..SsimParams::default()
        };
        assert!(ssim_map_with(a.view(), a.view(), &params).is_ok());
    }
}
