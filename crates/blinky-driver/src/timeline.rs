//! 时长量化
//!
//! 硬件以 `period × PERIOD_INCREMENT_US` 的间隔逐个播放采样表中的采样，
//! 所以一次播放的总时长为 `period × PERIOD_INCREMENT_US × samples_used`。
//! 给定请求时长，这里找出最小的周期，使采样数不超过 `NUM_SAMPLES`。

use crate::error::DriverError;
use blinky_protocol::{
    MAX_DURATION_US, MAX_PERIOD_TICKS, MIN_DURATION_US, NUM_SAMPLES, PERIOD_INCREMENT_US,
};

/// 量化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    /// 周期寄存器值（tick）
    pub period: u16,
    /// 实际使用的采样数（1..=NUM_SAMPLES）
    pub samples_used: usize,
}

impl Timeline {
    /// 这条时间线覆盖的时长（微秒）
    pub fn duration_us(&self) -> u64 {
        u64::from(self.period) * PERIOD_INCREMENT_US * self.samples_used as u64
    }

    pub fn period_us(&self) -> u64 {
        u64::from(self.period) * PERIOD_INCREMENT_US
    }
}

/// 把时长（微秒）量化为周期 + 采样数
///
/// # 错误
///
/// - `InvalidDuration`：超出 `[MIN_DURATION_US, MAX_DURATION_US]`，或不是
///   `PERIOD_INCREMENT_US` 的整数倍
/// - `IncompatibleDuration`：没有不超过 `MAX_PERIOD_TICKS` 的周期能整除该时长
///
/// # 示例
///
/// ```
/// use blinky_driver::quantize;
///
/// let timeline = quantize(10_000).unwrap();
/// assert_eq!((timeline.period, timeline.samples_used), (2, 50));
/// ```
pub fn quantize(duration_us: u64) -> Result<Timeline, DriverError> {
    if !(MIN_DURATION_US..=MAX_DURATION_US).contains(&duration_us)
        || duration_us % PERIOD_INCREMENT_US != 0
    {
        return Err(DriverError::InvalidDuration {
            duration_us,
            min_us: MIN_DURATION_US,
            max_us: MAX_DURATION_US,
            step_us: PERIOD_INCREMENT_US,
        });
    }

    let ticks = duration_us / PERIOD_INCREMENT_US;
    let first = ticks.div_ceil(NUM_SAMPLES as u64);
    let last = ticks.min(u64::from(MAX_PERIOD_TICKS));

    (first..=last)
        .find(|period| ticks % period == 0)
        .map(|period| Timeline {
            period: period as u16,
            samples_used: (ticks / period) as usize,
        })
        .ok_or(DriverError::IncompatibleDuration { duration_us })
}
