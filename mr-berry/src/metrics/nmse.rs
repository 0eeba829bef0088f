//! 归一化均方误差 (NMSE).

use ndarray::{Array3, ArrayView3, Zip};

use super::{check_shape, masked_mean};
use crate::consts::NMSE_CEILING;
use crate::error::MetricError;
use crate::RoiMask;

/// 整体 NMSE: `mean((pred - ref)^2) / mean(ref^2)`.
///
/// 参考体数据能量 `mean(ref^2) <= 0` 时返回 `+inf`. 不截断.
pub fn nmse(pred: ArrayView3<f32>, reference: ArrayView3<f32>) -> Result<f64, MetricError> {
    check_shape(reference.dim(), pred.dim())?;
    let (err, energy) = Zip::from(&pred).and(&reference).fold(
        (0.0f64, 0.0f64),
        |(err, energy), &p, &r| {
            let (p, r) = (p as f64, r as f64);
            (err + (p - r).powi(2), energy + r * r)
        },
    );
    // 两者同除以体素个数, 约去.
    if energy <= 0.0 {
        Ok(f64::INFINITY)
    } else {
        Ok(err / energy)
    }
}

/// 逐体素 NMSE 图: 逐体素平方误差除以 **掩膜区域内** 参考能量的均值.
///
/// 掩膜内参考能量为 0 时返回 `None`.
pub fn nmse_map(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
    mask: &RoiMask,
) -> Result<Option<Array3<f64>>, MetricError> {
    check_shape(reference.dim(), pred.dim())?;
    let energy = reference.mapv(|r| (r as f64).powi(2));
    let norm = masked_mean(energy.view(), mask)?;
    if norm <= 0.0 {
        return Ok(None);
    }
    Ok(Some(Zip::from(&pred).and(&reference).map_collect(|&p, &r| {
        (p as f64 - r as f64).powi(2) / norm
    })))
}

/// 掩膜 NMSE: 逐体素 NMSE 图在掩膜前景上的均值, 并截断到不超过 [`NMSE_CEILING`].
///
/// 掩膜内参考能量为 0 时按无穷大处理, 截断后即为 1.0.
pub fn nmse_masked(
    pred: ArrayView3<f32>,
    reference: ArrayView3<f32>,
    mask: &RoiMask,
) -> Result<f64, MetricError> {
    let raw = match nmse_map(pred, reference, mask)? {
        Some(map) => masked_mean(map.view(), mask)?,
        None => f64::INFINITY,
    };
    Ok(raw.min(NMSE_CEILING))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_utils::approx;

    #[test]
    fn test_nmse_whole() {
        let r = Array3::from_elem((2, 2, 2), 0.5f32);
        let p = Array3::from_elem((2, 2, 2), 0.25f32);
        // 0.0625 / 0.25
        assert!(approx(nmse(p.view(), r.view()).unwrap(), 0.25, 1e-12));
    }

    #[test]
    fn test_nmse_whole_is_not_clamped() {
        let r = Array3::from_elem((2, 2, 2), 0.1f32);
        let p = Array3::from_elem((2, 2, 2), 1.0f32);
        assert!(nmse(p.view(), r.view()).unwrap() > 1.0);
    }

    #[test]
    fn test_nmse_whole_zero_reference_is_infinite() {
        let r = Array3::<f32>::zeros((2, 2, 2));
        let p = Array3::from_elem((2, 2, 2), 0.5f32);
        assert_eq!(nmse(p.view(), r.view()), Ok(f64::INFINITY));
    }

    #[test]
    fn test_nmse_masked_uses_region_energy() {
        // 掩膜内参考能量为 1, 掩膜外参考能量为 0.
        let r = Array3::from_shape_vec((1, 1, 4), vec![1.0f32, 1.0, 0.0, 0.0]).unwrap();
        let p = Array3::from_shape_vec((1, 1, 4), vec![0.5f32, 1.0, 0.0, 0.0]).unwrap();
        let mask =
            RoiMask::from_array(Array3::from_shape_vec((1, 1, 4), vec![1u8, 1, 0, 0]).unwrap());
        // (0.25 + 0) / 2 / 1.0. 若按整体能量 0.5 归一则会得到 0.25.
        let v = nmse_masked(p.view(), r.view(), &mask).unwrap();
        assert!(approx(v, 0.125, 1e-12));
    }

    #[test]
    fn test_nmse_masked_clamped_to_one() {
        let r = Array3::from_elem((2, 2, 2), 0.05f32);
        let p = Array3::from_elem((2, 2, 2), 1.0f32);
        let mask = RoiMask::full((2, 2, 2));
        assert_eq!(nmse_masked(p.view(), r.view(), &mask), Ok(1.0));

        let zero = Array3::<f32>::zeros((2, 2, 2));
        assert_eq!(nmse_masked(p.view(), zero.view(), &mask), Ok(1.0));
        assert!(nmse_map(p.view(), zero.view(), &mask).unwrap().is_none());
    }

    #[test]
    fn test_nmse_masked_range() {
        let r = crate::metrics::test_utils::phantom((3, 4, 5));
        let p = &r + &crate::metrics::test_utils::noise((3, 4, 5), 0.5);
        let mask = RoiMask::threshold(r.view(), 0.3);
        let v = nmse_masked(p.view(), r.view(), &mask).unwrap();
        assert!((0.0..=1.0).contains(&v));
    }
}
