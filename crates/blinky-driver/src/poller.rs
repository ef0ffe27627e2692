//! 状态轮询
//!
//! 每个轮询周期在设备锁内执行一次：
//! 播放中时查询播放状态，然后读取热敏电阻并发布温度。
//!
//! 轮询任务与设备之间只共享一个 [`PollToken`]。设备关闭时先取消令牌，
//! 已经排队等锁的轮询拿到锁后看到令牌已取消，直接返回。

use crate::temperature::{TemperatureCalculation, Temperatures};
use crate::variables::HostBindings;
use arc_swap::ArcSwapOption;
use blinky_protocol::ThermistorValues;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// 轮询取消令牌
#[derive(Debug, Clone, Default)]
pub struct PollToken {
    cancelled: Arc<AtomicBool>,
}

impl PollToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// 温度发布
///
/// 轮询读数和等待其他响应时收到的主动推送读数都经过这里：
/// 换算为摄氏度，写入宿主温度变量，并更新最近一次读数的快照。
#[derive(Clone)]
pub struct TelemetryPublisher {
    calculation: TemperatureCalculation,
    bindings: HostBindings,
    last: Arc<ArcSwapOption<Temperatures>>,
}

impl TelemetryPublisher {
    pub fn new(calculation: TemperatureCalculation, bindings: HostBindings) -> Self {
        Self {
            calculation,
            bindings,
            last: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub fn publish(&self, raw: ThermistorValues) -> Temperatures {
        let temperatures = self.calculation.apply(raw);
        trace!("Publishing temperatures {:?}", temperatures.celsius);
        self.bindings.publish_temperatures(&temperatures);
        self.last.store(Some(Arc::new(temperatures)));
        temperatures
    }

    /// 最近一次发布的读数（无锁）
    pub fn last(&self) -> Option<Temperatures> {
        self.last.load_full().map(|t| *t)
    }
}
