//! 评分程序依赖的通用组件.

use std::io;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: io::Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 将 `--jobs` 参数换算为线程数: `0` 或缺省表示使用全部核心.
#[inline]
pub fn jobs_or_cpus(jobs: Option<usize>) -> usize {
    match jobs {
        Some(n) if n > 0 => n,
        _ => cpus(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sep_to() {
        let mut buf = Vec::new();
        sep_to(&mut buf).unwrap();
        assert_eq!(buf.len(), SEP.len() + 1);
        assert!(buf.iter().take(SEP.len()).all(|&b| b == b'-'));
    }

    #[test]
    fn test_jobs() {
        assert!(cpus() >= 1);
        assert_eq!(jobs_or_cpus(Some(3)), 3);
        assert_eq!(jobs_or_cpus(Some(0)), cpus());
        assert_eq!(jobs_or_cpus(None), cpus());
    }
}
