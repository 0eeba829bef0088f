//! 数据集目录操作.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

mod layout;

pub use layout::Layout;

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 一个参赛者的提交目录.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Participant {
    /// 参赛者标识, 即目录名.
    pub id: String,

    /// 提交目录.
    pub dir: PathBuf,
}

/// 列出 `root` 下的所有参赛者目录, 按目录名字典序排列. 非目录项被忽略.
///
/// 目录名不是合法 UTF-8 时按有损方式转换.
pub fn list_participants<P: AsRef<Path>>(root: P) -> io::Result<Vec<Participant>> {
    let mut ans = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        ans.push(Participant {
            id: entry.file_name().to_string_lossy().into_owned(),
            dir: entry.path(),
        });
    }
    ans.sort_unstable_by(|a, b| a.id.cmp(&b.id));
    Ok(ans)
}
