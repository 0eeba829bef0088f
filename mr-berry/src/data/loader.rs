//! 带诊断输出的体数据加载器.

use std::path::Path;

use crate::diag::{Diagnostics, SampleKey};
use crate::error::LoadError;
use crate::{MrVolume, RoiMask};

/// 体数据加载器.
///
/// 与 [`MrVolume::open`] 的区别是: 失败时会把原因报告给诊断接收者
/// (文件缺失为 `warn`, 其余为 `error`), 然后把错误原样返回给调用方.
/// 是否跳过该样本由调用方决定.
#[derive(Copy, Clone)]
pub struct VolumeLoader<'d> {
    diag: &'d dyn Diagnostics,
}

impl<'d> VolumeLoader<'d> {
    /// 初始化.
    #[inline]
    pub fn new(diag: &'d dyn Diagnostics) -> Self {
        Self { diag }
    }

    /// 加载 `path` 处的体数据. `what` 用于描述文件角色 (如 "submission").
    pub fn load(&self, path: &Path, key: &SampleKey, what: &str) -> Result<MrVolume, LoadError> {
        MrVolume::open(path).map_err(|e| self.report(e, key, what))
    }

    /// 加载 `path` 处的掩膜.
    pub fn load_mask(&self, path: &Path, key: &SampleKey) -> Result<RoiMask, LoadError> {
        RoiMask::open(path).map_err(|e| self.report(e, key, "mask"))
    }

    fn report(&self, e: LoadError, key: &SampleKey, what: &str) -> LoadError {
        if e.is_missing() {
            self.diag
                .warn(Some(key), format!("missing {what} file `{}`", e.path().display()));
        } else {
            self.diag.error(Some(key), format!("error loading {what}: {e}"));
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Level, MemoryDiagnostics};
    use ndarray::Array3;

    fn temp_file(name: &str) -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("mr_berry_loader_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_missing_file_is_a_warning() {
        let diag = MemoryDiagnostics::new();
        let loader = VolumeLoader::new(&diag);
        let key = SampleKey::new("team1", 1, "T1");

        let err = loader
            .load(&temp_file("absent.nii.gz"), &key, "submission")
            .unwrap_err();
        assert!(err.is_missing());
        assert_eq!(diag.count(Level::Warn), 1);
        assert_eq!(diag.count(Level::Error), 0);
        assert_eq!(diag.events()[0].key.as_ref(), Some(&key));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = temp_file("corrupt.npy");
        std::fs::write(&path, b"garbage").unwrap();

        let diag = MemoryDiagnostics::new();
        let loader = VolumeLoader::new(&diag);
        let key = SampleKey::new("team1", 2, "T2");
        assert!(loader.load(&path, &key, "reference").is_err());
        assert_eq!(diag.count(Level::Warn), 0);
        assert_eq!(diag.count(Level::Error), 1);
    }

    #[test]
    fn test_load_mask() {
        let path = temp_file("mask.npy");
        let mut data = Array3::<f32>::zeros((2, 2, 2));
        data[(1, 1, 1)] = 1.0;
        ndarray_npy::write_npy(&path, &data).unwrap();

        let diag = MemoryDiagnostics::new();
        let mask = VolumeLoader::new(&diag)
            .load_mask(&path, &SampleKey::new("team1", 2, "T1"))
            .unwrap();
        assert_eq!(mask.count(), 1);
        assert!(diag.events().is_empty());
    }
}
