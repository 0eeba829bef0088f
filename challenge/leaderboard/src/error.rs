//! 程序级错误. 只有这些错误会让程序以非零状态退出.

use std::io;
use std::path::PathBuf;

use mr_berry::error::ConfigError;
use thiserror::Error;

/// 程序级错误.
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 无法确定某个目录.
    #[error("{what} directory is not given and cannot be derived from `${env}` or the home directory")]
    MissingDir {
        /// 目录角色.
        what: &'static str,
        /// 对应的环境变量.
        env: &'static str,
    },

    /// 线程池初始化失败.
    #[error("cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// 文件读写失败.
    #[error("i/o error on `{}`: {source}", .path.display())]
    Io {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },

    /// CSV 导出失败.
    #[error("cannot write csv `{}`: {source}", .path.display())]
    Csv {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: csv::Error,
    },

    /// JSON 导出失败.
    #[error("cannot write json `{}`: {source}", .path.display())]
    Json {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: serde_json::Error,
    },

    /// 写 nifti 失败.
    #[error("cannot write nifti `{}`: {source}", .path.display())]
    Nifti {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// 写 npy 失败.
    #[error("cannot write npy `{}`: {source}", .path.display())]
    Npy {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: ndarray_npy::WriteNpyError,
    },
}

impl AppError {
    /// 构造 [`AppError::Io`].
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
