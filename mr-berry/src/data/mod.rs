use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayD, ArrayView3, ArrayViewMut3, Axis, Ix3, Zip};
use ndarray_npy::ReadNpyError;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::MASK_THRESHOLD;
use crate::error::LoadError;
use crate::normalize::{self, Normalization};
use crate::Idx3d;

pub mod loader;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 体数据文件格式. 由文件扩展名决定.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VolumeFormat {
    /// `.nii` 或 `.nii.gz`.
    Nifti,

    /// `.npy`, 按 `[z, H, W]` 顺序存储.
    Npy,
}

impl VolumeFormat {
    /// 从路径的文件名判断格式. 无法判断时返回 `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Some(Self::Nifti)
        } else if name.ends_with(".npy") {
            Some(Self::Npy)
        } else {
            None
        }
    }
}

/// 3D MRI 体数据. 强度以 `f32` 保存, 按 `[z, H, W]` 访问.
///
/// 从 nifti 文件打开时会同时保留 header, 仅用于读取体素间距等元信息;
/// 所有指标都不使用体素间距.
#[derive(Debug, Clone)]
pub struct MrVolume {
    header: Option<BoxedHeader>,
    data: Array3<f32>,
}

impl Index<Idx3d> for MrVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for MrVolume {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl MrVolume {
    /// 打开体数据文件. 格式由扩展名决定 (见 [`VolumeFormat`]).
    ///
    /// 文件不存在时返回 [`LoadError::Missing`], 以便调用方区分 "缺失" 和 "损坏".
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(LoadError::Missing {
                path: path.to_owned(),
            });
        }
        match VolumeFormat::from_path(path) {
            Some(VolumeFormat::Nifti) => Self::open_nifti(path),
            Some(VolumeFormat::Npy) => Self::open_npy(path),
            None => Err(LoadError::UnsupportedFormat {
                path: path.to_owned(),
            }),
        }
    }

    fn open_nifti(path: &Path) -> Result<Self, LoadError> {
        let nifti_err = |source| LoadError::Nifti {
            path: path.to_owned(),
            source,
        };
        let obj = ReaderOptions::new().read_file(path).map_err(nifti_err)?;
        let header = Box::new(obj.header().clone());
        let data = obj
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(nifti_err)?;

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = squeeze_to_3d(path, data)?.permuted_axes([2, 1, 0]);
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };

        Ok(Self {
            header: Some(header),
            data,
        })
    }

    fn open_npy(path: &Path) -> Result<Self, LoadError> {
        let npy_err = |source| LoadError::Npy {
            path: path.to_owned(),
            source,
        };
        // 先按 f32 读, dtype 不符时再按 f64 读.
        let data = match ndarray_npy::read_npy::<_, Array3<f32>>(path) {
            Ok(data) => data,
            Err(ReadNpyError::WrongDescriptor(_)) => {
                ndarray_npy::read_npy::<_, Array3<f64>>(path)
                    .map_err(npy_err)?
                    .mapv(|v| v as f32)
            }
            Err(e) => return Err(npy_err(e)),
        };
        Ok(Self::from_array(data))
    }

    /// 直接从 `[z, H, W]` 顺序的数组创建体数据. 该体数据没有 header.
    #[inline]
    pub fn from_array(data: Array3<f32>) -> Self {
        Self { header: None, data }
    }

    /// 获取数据形状 `(z, H, W)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取数据体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获取 nifti header. 非 nifti 来源的体数据返回 `None`.
    #[inline]
    pub fn header(&self) -> Option<&NiftiHeader> {
        self.header.as_deref()
    }

    /// 获取单个体素分辨率 (毫米), 分别代表空间 (相邻切片方向), 高, 宽.
    /// 没有 header 时返回 `None`.
    #[inline]
    pub fn pix_dim(&self) -> Option<[f64; 3]> {
        let [_, w, h, z, ..] = self.header()?.pixdim;
        Some([z as f64, h as f64, w as f64])
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut3<'_, f32> {
        self.data.view_mut()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<f32> {
        self.data
    }

    /// 就地 min-max 归一化到 `[0, 1]`. 详见 [`normalize::normalize_in_place`].
    #[inline]
    pub fn normalize(&mut self) -> Normalization {
        normalize::normalize_in_place(self.data_mut())
    }
}

/// 去掉 nifti 中尾部长度为 1 的时间维, 并确认数据是 3D 的.
fn squeeze_to_3d(path: &Path, data: ArrayD<f32>) -> Result<Array3<f32>, LoadError> {
    let data = match data.ndim() {
        3 => data,
        4 if data.len_of(Axis(3)) == 1 => data.index_axis_move(Axis(3), 0),
        ndim => {
            return Err(LoadError::Dimensionality {
                path: path.to_owned(),
                ndim,
            })
        }
    };
    data.into_dimensionality::<Ix3>()
        .map_err(|source| LoadError::Shape {
            path: path.to_owned(),
            source,
        })
}

/// 3D 二值感兴趣区域掩膜. 体素值只会是 0 或 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiMask {
    data: Array3<u8>,
}

impl Index<Idx3d> for RoiMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl RoiMask {
    /// 打开掩膜文件, 并以 [`MASK_THRESHOLD`] 二值化.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        MrVolume::open(path).map(|v| Self::from_volume(&v))
    }

    /// 以 [`MASK_THRESHOLD`] 二值化体数据 (未归一化的原始强度).
    #[inline]
    pub fn from_volume(volume: &MrVolume) -> Self {
        Self::threshold(volume.data(), MASK_THRESHOLD)
    }

    /// 将 `data` 中严格大于 `threshold` 的体素设为 1, 其余设为 0.
    pub fn threshold(data: ArrayView3<f32>, threshold: f32) -> Self {
        Self {
            data: data.mapv(|v| u8::from(v > threshold)),
        }
    }

    /// 从整数数组创建掩膜. 非零体素均视为前景.
    pub fn from_array(mut data: Array3<u8>) -> Self {
        data.mapv_inplace(|v| u8::from(v != 0));
        Self { data }
    }

    /// 创建形状为 `shape` 的全前景掩膜.
    #[inline]
    pub fn full(shape: Idx3d) -> Self {
        Self {
            data: Array3::ones(shape),
        }
    }

    /// 获取数据形状 `(z, H, W)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取前景体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| **p != 0).count()
    }

    /// 掩膜是否没有任何前景体素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|p| *p == 0)
    }

    /// 获取前景体素所占比例. 空数组返回 0.
    pub fn coverage(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            self.count() as f64 / self.data.len() as f64
        }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 将掩膜外的体素清零, 返回新的体数据. 仅用于可视化或导出, 不用于计算指标.
    pub fn apply(&self, volume: ArrayView3<f32>) -> Array3<f32> {
        Zip::from(&volume)
            .and(&self.data)
            .map_collect(|&v, &m| if m != 0 { v } else { 0.0 })
    }
}
