//! 对 `mr-berry::dataset` 的更一层封装. 从环境变量或用户主目录解析数据集目录.

use mr_berry::dataset::home_dataset_dir_with;
use std::env;
use std::path::PathBuf;

/// 参赛者提交根目录的环境变量名.
pub const SUBMISSION_DIR_ENV: &str = "MR_SUBMISSION_DIR";

/// 真值根目录的环境变量名.
pub const REFERENCE_DIR_ENV: &str = "MR_REFERENCE_DIR";

/// 掩膜根目录的环境变量名.
pub const MASK_DIR_ENV: &str = "MR_MASK_DIR";

/// 若环境变量 `var` 非空则返回其值, 否则返回 `$HOME/dataset/{tail...}`.
/// 两者都不可用时返回 `None`.
fn dir_from_env_or_home(var: &str, tail: &[&str]) -> Option<PathBuf> {
    match env::var_os(var) {
        Some(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(tail),
    }
}

/// 获取参赛者提交根目录.
///
/// 1. 若环境变量 `$MR_SUBMISSION_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/submissions`.
#[inline]
pub fn submission_dir_from_env_or_home() -> Option<PathBuf> {
    dir_from_env_or_home(SUBMISSION_DIR_ENV, &["submissions"])
}

/// 获取真值根目录.
///
/// 1. 若环境变量 `$MR_REFERENCE_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/reference`.
#[inline]
pub fn reference_dir_from_env_or_home() -> Option<PathBuf> {
    dir_from_env_or_home(REFERENCE_DIR_ENV, &["reference"])
}

/// 获取掩膜根目录.
///
/// 1. 若环境变量 `$MR_MASK_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/masks`.
#[inline]
pub fn mask_dir_from_env_or_home() -> Option<PathBuf> {
    dir_from_env_or_home(MASK_DIR_ENV, &["masks"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_wins_over_home() {
        // 只使用本测试独有的变量名, 避免与其他测试互相干扰.
        let var = "MR_BERRY_UTILS_TEST_DIR";
        env::set_var(var, "/data/custom");
        assert_eq!(
            dir_from_env_or_home(var, &["x"]),
            Some(PathBuf::from("/data/custom"))
        );
        env::set_var(var, "");
        assert_eq!(
            dir_from_env_or_home(var, &["x"]),
            home_dataset_dir_with(["x"])
        );
        env::remove_var(var);
    }
}
