//! 周期任务调度
//!
//! 驱动只依赖 [`TaskScheduler`] 能力：按固定间隔反复执行一个闭包，
//! 并返回可取消的句柄。默认实现 [`ThreadScheduler`] 为每个任务启动一个
//! 线程；[`ManualScheduler`] 由调用者手动触发，便于确定性测试。

use crossbeam_channel::{Sender, bounded, select, tick};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{trace, warn};

/// 被周期执行的任务
pub type Task = Box<dyn FnMut() + Send + 'static>;

/// 已调度任务的句柄
pub trait ScheduledTask: Send {
    /// 取消任务
    ///
    /// 返回后任务不会再开始新的执行。重复调用是安全的。
    fn cancel(&mut self);

    fn is_cancelled(&self) -> bool;
}

/// 周期调度能力
pub trait TaskScheduler: Send + Sync {
    fn schedule(&self, interval: Duration, task: Task) -> Box<dyn ScheduledTask>;
}

/// 为 JoinHandle 添加超时 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = bounded(1);

        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(_) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
        }
    }
}

/// 每个任务一个线程的调度器
#[derive(Debug, Clone)]
pub struct ThreadScheduler {
    join_timeout: Duration,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self {
            join_timeout: Duration::from_secs(2),
        }
    }

    /// 取消时等待工作线程退出的最长时间
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for ThreadScheduler {
    fn schedule(&self, interval: Duration, mut task: Task) -> Box<dyn ScheduledTask> {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let ticker = tick(interval);

        let handle = spawn(move || {
            loop {
                select! {
                    // 发送端被 drop 时 recv 立即返回 Err
                    recv(cancel_rx) -> _ => break,
                    recv(ticker) -> _ => task(),
                }
            }
            trace!("Periodic task thread exited");
        });

        Box::new(ThreadTask {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
            join_timeout: self.join_timeout,
        })
    }
}

struct ThreadTask {
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl ScheduledTask for ThreadTask {
    fn cancel(&mut self) {
        // drop 发送端即通知线程退出
        self.cancel_tx.take();

        let Some(handle) = self.handle.take() else {
            return;
        };

        // 在任务线程内部取消时不能 join 自己
        if handle.thread().id() == std::thread::current().id() {
            return;
        }

        if let Err(e) = handle.join_timeout(self.join_timeout) {
            warn!("Periodic task thread did not exit cleanly: {:?}", e);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_tx.is_none()
    }
}

impl Drop for ThreadTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct ManualEntry {
    cancelled: Arc<AtomicBool>,
    task: Task,
}

/// 手动触发的调度器
///
/// `schedule` 只登记任务，[`ManualScheduler::run_pending`] 把每个未取消的
/// 任务执行一次。间隔参数被忽略。
#[derive(Clone, Default)]
pub struct ManualScheduler {
    entries: Arc<Mutex<Vec<ManualEntry>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 执行一轮：每个未取消的任务执行一次，返回执行的任务数
    pub fn run_pending(&self) -> usize {
        let mut entries = self.entries.lock();
        entries.retain(|entry| !entry.cancelled.load(Ordering::Acquire));
        for entry in entries.iter_mut() {
            (entry.task)();
        }
        entries.len()
    }

    /// 当前登记且未取消的任务数
    pub fn active_tasks(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| !entry.cancelled.load(Ordering::Acquire))
            .count()
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule(&self, _interval: Duration, task: Task) -> Box<dyn ScheduledTask> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.entries.lock().push(ManualEntry {
            cancelled: cancelled.clone(),
            task,
        });
        Box::new(ManualTask { cancelled })
    }
}

struct ManualTask {
    cancelled: Arc<AtomicBool>,
}

impl ScheduledTask for ManualTask {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
