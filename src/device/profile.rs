//! 前向推理计时

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// 单次前向推理的耗时
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassTiming {
    /// 在本次采样窗口内的序号（从 0 开始）
    pub index: usize,
    /// 耗时
    pub elapsed: Duration,
}

/// 一个采样窗口的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileResult {
    /// 窗口打开时间；从未打开时为空
    pub started_at: Option<DateTime<Utc>>,
    /// 窗口关闭时间
    pub finished_at: Option<DateTime<Utc>>,
    /// 窗口内每次前向推理的耗时
    pub passes: Vec<PassTiming>,
}

impl ProfileResult {
    /// 是否没有记录到任何前向推理
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// 总耗时
    pub fn total(&self) -> Duration {
        self.passes.iter().map(|p| p.elapsed).sum()
    }

    /// 平均耗时
    pub fn mean(&self) -> Option<Duration> {
        let count = u32::try_from(self.passes.len()).ok().filter(|&n| n > 0)?;
        Some(self.total() / count)
    }

    /// 序列化为 JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug)]
struct Window {
    started_at: DateTime<Utc>,
    passes: Vec<PassTiming>,
    pass_started: Option<Instant>,
}

/// 采样器：只有在窗口打开时才记录
#[derive(Debug, Default)]
pub struct Profiler {
    window: Option<Window>,
}

impl Profiler {
    /// 未打开窗口的采样器
    pub fn new() -> Self {
        Self::default()
    }

    /// 窗口是否打开
    pub fn is_active(&self) -> bool {
        self.window.is_some()
    }

    /// 打开新窗口；已有窗口时丢弃其记录重新开始
    pub fn start(&mut self) {
        self.window = Some(Window {
            started_at: Utc::now(),
            passes: Vec::new(),
            pass_started: None,
        });
    }

    /// 记录一次前向推理的开始
    pub fn begin_pass(&mut self) {
        if let Some(window) = self.window.as_mut() {
            window.pass_started = Some(Instant::now());
        }
    }

    /// 记录结束；没有对应的开始时忽略
    pub fn end_pass(&mut self) {
        if let Some(window) = self.window.as_mut() {
            if let Some(started) = window.pass_started.take() {
                let index = window.passes.len();
                window.passes.push(PassTiming {
                    index,
                    elapsed: started.elapsed(),
                });
            }
        }
    }

    /// 关闭窗口并返回结果；没有打开的窗口时返回空结果
    pub fn finish(&mut self) -> ProfileResult {
        match self.window.take() {
            Some(window) => ProfileResult {
                started_at: Some(window.started_at),
                finished_at: Some(Utc::now()),
                passes: window.passes,
            },
            None => ProfileResult::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_without_start() {
        let mut profiler = Profiler::new();
        profiler.begin_pass();
        profiler.end_pass();
        let result = profiler.finish();
        assert_eq!(result, ProfileResult::default());
        assert!(result.mean().is_none());
    }

    #[test]
    fn test_records_passes_in_window() {
        let mut profiler = Profiler::new();
        profiler.start();
        for _ in 0..3 {
            profiler.begin_pass();
            profiler.end_pass();
        }
        assert!(profiler.is_active());

        let result = profiler.finish();
        assert!(!profiler.is_active());
        assert_eq!(result.passes.len(), 3);
        assert_eq!(result.passes[2].index, 2);
        assert!(result.started_at.unwrap() <= result.finished_at.unwrap());
        assert!(result.mean().is_some());
    }

    #[test]
    fn test_end_without_begin_is_ignored() {
        let mut profiler = Profiler::new();
        profiler.start();
        profiler.end_pass();
        assert!(profiler.finish().is_empty());
    }

    #[test]
    fn test_to_json() {
        let mut profiler = Profiler::new();
        profiler.start();
        profiler.begin_pass();
        profiler.end_pass();
        let json = profiler.finish().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["passes"].as_array().unwrap().len(), 1);
        assert!(value["started_at"].is_string());
    }
}
