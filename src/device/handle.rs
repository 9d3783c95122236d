//! 设备与命令队列句柄
//!
//! 句柄是加速器 SDK 的不透明对象，绑定层从不自行构造真实设备，
//! 只通过 `Arc` 与创建者共享所有权：最后一个持有者释放时设备才被销毁。
//!
//! [`HostDevice`] / [`HostQueue`] 是进程内实现，供 CPU 回退路径和测试使用。

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

/// 设备在等待期间报告的致命错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeviceFault(pub String);

/// 计算设备
pub trait ComputeDevice: fmt::Debug + Send + Sync {
    /// 设备名（例如 "cuda:0"）
    fn name(&self) -> String;

    /// 句柄是否仍然有效；无效句柄不能绑定到上下文
    fn is_valid(&self) -> bool {
        true
    }
}

/// 命令队列（设备上下文）
pub trait CommandQueue: fmt::Debug + Send + Sync {
    /// 提交已录制的工作，不等待完成
    fn flush(&self) -> Result<(), DeviceFault> {
        Ok(())
    }

    /// 阻塞调用线程，直到队列上的全部工作完成
    fn wait_idle(&self) -> Result<(), DeviceFault>;

    /// 队列是否仍然可用
    fn is_valid(&self) -> bool {
        true
    }
}

/// 进程内设备
#[derive(Debug)]
pub struct HostDevice {
    name: String,
    valid: AtomicBool,
}

impl HostDevice {
    /// 创建名为 `name` 的有效设备
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            valid: AtomicBool::new(true),
        }
    }

    /// 使句柄失效（模拟被驱动回收的设备）
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new("host")
    }
}

impl ComputeDevice for HostDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }
}

type Job = Box<dyn FnOnce() -> Result<(), DeviceFault> + Send>;

/// 进程内命令队列
///
/// `submit` 只入队；`wait_idle` 在调用线程上按提交顺序执行全部作业。
/// 第一个失败的作业会使队列进入故障状态，之后的等待都返回同一个故障。
///
/// 多个上下文可以共享同一个队列：同一时刻只有一个调用方在执行作业，
/// 其余 `wait_idle` 调用阻塞到执行结束，因此返回时之前提交的作业都已完成。
/// 作业内部不能对自己所在的队列调用 `wait_idle`。
pub struct HostQueue {
    jobs: Mutex<Vec<Job>>,
    drain: Mutex<()>,
    fault: Mutex<Option<DeviceFault>>,
    completed: AtomicU64,
}

impl HostQueue {
    /// 创建空队列
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            drain: Mutex::new(()),
            fault: Mutex::new(None),
            completed: AtomicU64::new(0),
        }
    }

    /// 入队一个作业
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() -> Result<(), DeviceFault> + Send + 'static,
    {
        self.jobs.lock().push(Box::new(job));
    }

    /// 尚未执行的作业数
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// 已完成的作业数
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// 已锁存的故障
    pub fn fault(&self) -> Option<DeviceFault> {
        self.fault.lock().clone()
    }
}

impl Default for HostQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostQueue")
            .field("pending", &self.pending())
            .field("completed", &self.completed())
            .field("fault", &self.fault())
            .finish()
    }
}

impl CommandQueue for HostQueue {
    fn wait_idle(&self) -> Result<(), DeviceFault> {
        // 整个执行期间持有，并发的等待者在此阻塞到执行结束
        let _drain = self.drain.lock();

        loop {
            if let Some(fault) = self.fault() {
                return Err(fault);
            }

            // 先取出作业再执行，作业内部可以继续 submit 而不会死锁
            let jobs = std::mem::take(&mut *self.jobs.lock());
            if jobs.is_empty() {
                return Ok(());
            }
            for job in jobs {
                if let Err(fault) = job() {
                    self.jobs.lock().clear();
                    *self.fault.lock() = Some(fault.clone());
                    return Err(fault);
                }
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn is_valid(&self) -> bool {
        self.fault.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_wait_idle_runs_jobs_in_order() {
        let queue = HostQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            queue.submit(move || {
                log.lock().push(i);
                Ok(())
            });
        }
        assert_eq!(queue.pending(), 3);

        queue.wait_idle().unwrap();
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.completed(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_fault_is_latched() {
        let queue = HostQueue::new();
        queue.submit(|| Err(DeviceFault("ECC error".to_string())));
        queue.submit(|| Ok(()));

        assert_eq!(queue.wait_idle(), Err(DeviceFault("ECC error".to_string())));
        assert_eq!(queue.pending(), 0);
        assert!(!queue.is_valid());
        assert!(queue.wait_idle().is_err());
    }

    #[test]
    fn test_concurrent_waiter_blocks_until_drained() {
        let queue = Arc::new(HostQueue::new());
        let started = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        {
            let started = Arc::clone(&started);
            let finished = Arc::clone(&finished);
            queue.submit(move || {
                started.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(200));
                finished.store(true, Ordering::SeqCst);
                Ok(())
            });
        }

        let runner = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.wait_idle())
        };
        while !started.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }

        queue.wait_idle().unwrap();
        assert!(finished.load(Ordering::SeqCst));
        runner.join().unwrap().unwrap();
        assert_eq!(queue.completed(), 1);
    }

    #[test]
    fn test_jobs_submitted_by_jobs_complete() {
        let queue = Arc::new(HostQueue::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let inner_queue = Arc::clone(&queue);
            let log = Arc::clone(&log);
            queue.submit(move || {
                log.lock().push("outer");
                let log = Arc::clone(&log);
                inner_queue.submit(move || {
                    log.lock().push("inner");
                    Ok(())
                });
                Ok(())
            });
        }

        queue.wait_idle().unwrap();
        assert_eq!(*log.lock(), vec!["outer", "inner"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_device_invalidate() {
        let device = HostDevice::new("npu:0");
        assert!(device.is_valid());
        device.invalidate();
        assert!(!device.is_valid());
        assert_eq!(device.name(), "npu:0");
    }

    #[test]
    fn test_shared_ownership() {
        let device = Arc::new(HostDevice::default());
        let shared: Arc<dyn ComputeDevice> = device.clone();
        assert_eq!(Arc::strong_count(&device), 2);
        drop(shared);
        assert_eq!(Arc::strong_count(&device), 1);
    }
}
