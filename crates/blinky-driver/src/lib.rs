//! # Blinky Driver
//!
//! Blackrock "Blinky 1.0" LED 照明控制器的设备驱动，包括：
//! - 请求 / 响应交换（含主动推送遥测的分派）
//! - 时长量化（周期 × 采样数）
//! - 播放状态机（Idle / Configured / Playing）
//! - 后台状态轮询与温度发布
//! - 模拟模式（不打开串口）
//!
//! # 使用
//!
//! ```no_run
//! use blinky_driver::{DeviceConfig, LedDriverBuilder};
//!
//! let config = DeviceConfig::load("blinky.toml")?;
//! let driver = LedDriverBuilder::new().config(config).build()?;
//!
//! driver.set_intensity(&[1, 2, 3, 4], 0.25)?;
//! let timeline = driver.run(2_000_000)?;
//! println!("period {} ticks, {} samples", timeline.period, timeline.samples_used);
//! # Ok::<(), blinky_driver::DriverError>(())
//! ```

mod builder;
pub mod clock;
mod config;
mod device;
mod error;
pub mod link;
pub mod mode;
mod playback;
pub mod poller;
pub mod scheduler;
pub mod temperature;
mod timeline;
pub mod variables;

pub use builder::LedDriverBuilder;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{DEFAULT_BAUD_RATE, DEFAULT_DESCRIPTION, DeviceConfig};
pub use device::LedDriver;
pub use error::DriverError;
pub use link::{Link, TelemetrySink};
pub use mode::DriverMode;
pub use playback::PlaybackState;
pub use poller::{PollToken, TelemetryPublisher};
pub use scheduler::{ManualScheduler, ScheduledTask, Task, TaskScheduler, ThreadScheduler};
pub use temperature::{TemperatureCalculation, Temperatures};
pub use timeline::{Timeline, quantize};
pub use variables::{HostBindings, HostVariable, MemoryVariable, Value};
