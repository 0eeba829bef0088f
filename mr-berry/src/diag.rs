//! 诊断信息输出.
//!
//! 评估流程不直接写全局日志, 而是把结构化事件交给调用方注入的 [`Diagnostics`].
//! 生产环境使用 [`LogDiagnostics`] 转发到 `log` facade; 测试使用
//! [`MemoryDiagnostics`] 收集事件后断言.

use std::fmt;
use std::sync::{Mutex, PoisonError};

pub use log::Level;

/// 单个样本的定位信息: 参赛者 × 受试者 × 模态.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SampleKey {
    /// 参赛者 (提交目录名).
    pub participant: String,

    /// 受试者编号.
    pub subject: u32,

    /// 模态名.
    pub modality: String,
}

impl SampleKey {
    /// 构建定位信息.
    pub fn new(participant: impl Into<String>, subject: u32, modality: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            subject,
            modality: modality.into(),
        }
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - Subject {} - {}",
            self.participant, self.subject, self.modality
        )
    }
}

/// 一条诊断事件.
#[derive(Clone, Debug)]
pub struct Event {
    /// 级别. 只会使用 `Info`, `Warn` 和 `Error`.
    pub level: Level,

    /// 事件关联的样本. 与单个样本无关的事件为 `None`.
    pub key: Option<SampleKey>,

    /// 事件描述.
    pub message: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{key}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// 诊断信息接收者.
///
/// 评估可能并行进行, 因此实现必须是 `Sync` 的.
pub trait Diagnostics: Sync {
    /// 接收一条事件.
    fn emit(&self, event: Event);

    /// 发出 `info` 级别事件.
    #[inline]
    fn info(&self, key: Option<&SampleKey>, message: String) {
        self.emit(Event {
            level: Level::Info,
            key: key.cloned(),
            message,
        });
    }

    /// 发出 `warn` 级别事件.
    #[inline]
    fn warn(&self, key: Option<&SampleKey>, message: String) {
        self.emit(Event {
            level: Level::Warn,
            key: key.cloned(),
            message,
        });
    }

    /// 发出 `error` 级别事件.
    #[inline]
    fn error(&self, key: Option<&SampleKey>, message: String) {
        self.emit(Event {
            level: Level::Error,
            key: key.cloned(),
            message,
        });
    }
}

/// 将事件转发到 `log` facade. 具体输出位置由二进制程序安装的 logger 决定.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&self, event: Event) {
        log::log!(target: "mr_berry", event.level, "{event}");
    }
}

/// 在内存中收集全部事件.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    events: Mutex<Vec<Event>>,
}

impl MemoryDiagnostics {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取目前收集到的所有事件的拷贝.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 统计级别为 `level` 的事件个数.
    pub fn count(&self, level: Level) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.level == level)
            .count()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// 丢弃全部事件.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    #[inline]
    fn emit(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_key_display() {
        let key = SampleKey::new("team1", 3, "FLAIR");
        assert_eq!(key.to_string(), "team1 - Subject 3 - FLAIR");
    }

    #[test]
    fn test_memory_diagnostics_counts_levels() {
        let diag = MemoryDiagnostics::new();
        let key = SampleKey::new("team1", 1, "T1");
        diag.info(Some(&key), "ok".to_string());
        diag.warn(Some(&key), "missing".to_string());
        diag.warn(None, "degenerate".to_string());
        diag.error(None, "broken".to_string());

        assert_eq!(diag.count(Level::Info), 1);
        assert_eq!(diag.count(Level::Warn), 2);
        assert_eq!(diag.count(Level::Error), 1);

        let events = diag.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].to_string(), "team1 - Subject 1 - T1: missing");
        assert_eq!(events[2].to_string(), "degenerate");
    }

    #[test]
    fn test_log_diagnostics_forwards_to_logger() {
        LogDiagnostics.warn(None, "nobody listens".to_string());

        // 全局 logger 只能安装一次, 其他测试可能已经装过.
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Info)
            .init();
        let key = SampleKey::new("team1", 2, "T2");
        LogDiagnostics.info(Some(&key), "SSIM: 0.9000".to_string());
        LogDiagnostics.error(Some(&key), "broken".to_string());
    }
}
