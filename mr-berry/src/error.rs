//! 运行时错误.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Idx3d;

/// 加载体数据或掩膜时的错误.
///
/// 这类错误只影响单个样本. 调用方必须显式决定跳过还是中止.
#[derive(Debug, Error)]
pub enum LoadError {
    /// 文件不存在.
    #[error("file `{}` does not exist", .path.display())]
    Missing {
        /// 文件路径.
        path: PathBuf,
    },

    /// nifti 文件无法读取或已损坏.
    #[error("cannot read nifti file `{}`: {source}", .path.display())]
    Nifti {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// npy 文件无法读取或已损坏.
    #[error("cannot read npy file `{}`: {source}", .path.display())]
    Npy {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: ndarray_npy::ReadNpyError,
    },

    /// 无法从扩展名判断文件格式.
    #[error("unsupported volume format `{}`", .path.display())]
    UnsupportedFormat {
        /// 文件路径.
        path: PathBuf,
    },

    /// 数据不是 3D 标量体数据.
    #[error("`{}` has {ndim} dimensions, expected a 3D volume", .path.display())]
    Dimensionality {
        /// 文件路径.
        path: PathBuf,
        /// 实际维数.
        ndim: usize,
    },

    /// 数据形状无法转换.
    #[error("`{}` has an invalid shape: {source}", .path.display())]
    Shape {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: ndarray::ShapeError,
    },
}

impl LoadError {
    /// 是否是 "文件不存在" 错误.
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    /// 出错文件的路径.
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path }
            | Self::Nifti { path, .. }
            | Self::Npy { path, .. }
            | Self::UnsupportedFormat { path }
            | Self::Dimensionality { path, .. }
            | Self::Shape { path, .. } => path,
        }
    }
}

/// 计算指标时的错误. 出现时该样本的四个指标全部记为不可用.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetricError {
    /// 参与比较的体数据 (或掩膜) 形状不一致.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// 参考形状.
        expected: Idx3d,
        /// 实际形状.
        found: Idx3d,
    },

    /// 掩膜中没有前景体素, 掩膜均值无定义.
    #[error("mask has no foreground voxel")]
    EmptyMask,

    /// 体数据某一维小于 SSIM 窗口.
    #[error("volume of shape {shape:?} is smaller than the {window}-voxel ssim window")]
    VolumeTooSmall {
        /// 体数据形状.
        shape: Idx3d,
        /// 窗口边长.
        window: usize,
    },

    /// SSIM 窗口边长必须是不小于 3 的奇数.
    #[error("ssim window size must be odd and at least 3, got {0}")]
    InvalidWindow(usize),
}

/// 配置错误.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败.
    #[error("cannot read config `{}`: {source}", .path.display())]
    Io {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// 配置文件解析失败.
    #[cfg(feature = "serde")]
    #[error("cannot parse config `{}`: {source}", .path.display())]
    Json {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: serde_json::Error,
    },

    /// 配置内容不合法.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// 单个样本不可用的原因.
#[derive(Debug, Error)]
pub enum SampleError {
    /// 提交、真值或掩膜加载失败.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// 指标计算失败.
    #[error(transparent)]
    Metric(#[from] MetricError),

    /// 该受试者的掩膜不可用, 其全部模态随之不可用.
    #[error("mask of subject {0} is unavailable")]
    MaskUnavailable(u32),
}
