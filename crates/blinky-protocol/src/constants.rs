//! 设备常量定义
//!
//! 这些值由控制器固件决定，决定了采样表的线路尺寸和可表示的播放时长。

/// 每块驱动板的 LED 通道数
pub const NUM_CHANNELS: usize = 64;

/// 采样表长度（硬件每个 tick 播放一个采样）
pub const NUM_SAMPLES: usize = 50;

/// 周期寄存器的时间步进（微秒 / tick）
pub const PERIOD_INCREMENT_US: u64 = 100;

/// 周期寄存器的最大值（tick）
pub const MAX_PERIOD_TICKS: u16 = u16::MAX;

/// 最短周期（微秒）
pub const MIN_PERIOD_US: u64 = PERIOD_INCREMENT_US;

/// 最长周期（微秒）
pub const MAX_PERIOD_US: u64 = MAX_PERIOD_TICKS as u64 * PERIOD_INCREMENT_US;

/// 最短播放时长（微秒）：period = 1，只使用 1 个采样
pub const MIN_DURATION_US: u64 = MIN_PERIOD_US;

/// 最长播放时长（微秒）：period 取最大值，使用全部采样
pub const MAX_DURATION_US: u64 = MAX_PERIOD_US * NUM_SAMPLES as u64;
