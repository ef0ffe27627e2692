//! Builder 模式实现
//!
//! 提供链式构造 [`LedDriver`] 实例的便捷方式。

use crate::clock::{Clock, MonotonicClock};
use crate::config::DeviceConfig;
use crate::device::{DriverCore, LedDriver};
use crate::error::DriverError;
use crate::link::Link;
use crate::mode::DriverMode;
use crate::poller::TelemetryPublisher;
use crate::scheduler::{TaskScheduler, ThreadScheduler};
use crate::temperature::TemperatureCalculation;
use crate::variables::{HostBindings, HostVariable};
use blinky_serial::SerialTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// LedDriver Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use blinky_driver::{LedDriverBuilder, MemoryVariable};
///
/// // 按 USB 描述 "Blinky 1.0" 查找设备
/// let driver = LedDriverBuilder::new().build().unwrap();
///
/// // 指定串口，绑定 running 变量
/// let running = MemoryVariable::new("running");
/// let driver = LedDriverBuilder::new()
///     .port("/dev/ttyUSB0")
///     .running_variable(running)
///     .build()
///     .unwrap();
/// ```
pub struct LedDriverBuilder {
    config: DeviceConfig,
    /// 外部提供的传输（优先于 `config.port` / `config.description`）
    transport: Option<Box<dyn SerialTransport>>,
    scheduler: Option<Arc<dyn TaskScheduler>>,
    clock: Option<Arc<dyn Clock>>,
    bindings: HostBindings,
}

impl LedDriverBuilder {
    pub fn new() -> Self {
        Self {
            config: DeviceConfig::default(),
            transport: None,
            scheduler: None,
            clock: None,
            bindings: HostBindings::default(),
        }
    }

    /// 使用完整配置（覆盖之前的单项设置）
    pub fn config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }

    /// 串口路径
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = Some(port.into());
        self
    }

    /// 按 USB 产品描述查找设备
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    pub fn simulate(mut self, simulate: bool) -> Self {
        self.config.simulate = simulate;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn temperature(mut self, calculation: TemperatureCalculation) -> Self {
        self.config.temperature = calculation;
        self
    }

    /// 使用已打开的传输（测试或自定义后端）
    pub fn transport(mut self, transport: impl SerialTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn bindings(mut self, bindings: HostBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn running_variable(mut self, variable: Arc<dyn HostVariable>) -> Self {
        self.bindings.running = Some(variable);
        self
    }

    /// 热敏电阻温度变量（0..4 对应 A、B、C、D）
    pub fn temperature_variable(mut self, index: usize, variable: Arc<dyn HostVariable>) -> Self {
        match self.bindings.temperatures.get_mut(index) {
            Some(slot) => *slot = Some(variable),
            None => warn!("Ignoring temperature variable for thermistor index {}", index),
        }
        self
    }

    /// 构建 LedDriver 实例
    ///
    /// 硬件模式下打开串口并配置超时；模拟模式下不打开串口。
    /// 两种模式都会启动状态轮询。
    pub fn build(self) -> Result<LedDriver, DriverError> {
        let config = self.config;
        config.validate()?;

        let mode = DriverMode::from_simulate_flag(config.simulate);
        let publisher = TelemetryPublisher::new(config.temperature, self.bindings.clone());

        let link = match mode {
            DriverMode::Simulated => {
                info!("LED driver running in simulate mode, no serial port opened");
                None
            },
            DriverMode::Hardware => {
                let mut transport = match self.transport {
                    Some(transport) => transport,
                    None => open_transport(&config)?,
                };
                transport.set_timeouts(config.read_timeout(), config.write_timeout())?;

                let sink = publisher.clone();
                Some(Link::new(
                    transport,
                    Box::new(move |raw| {
                        sink.publish(raw);
                    }),
                ))
            },
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let scheduler = self.scheduler.unwrap_or_else(|| Arc::new(ThreadScheduler::new()));

        self.bindings.set_running(false);
        let core = DriverCore::new(mode, link, self.bindings, publisher.clone(), clock);

        Ok(LedDriver::start(
            core,
            publisher,
            scheduler.as_ref(),
            config.poll_interval(),
        ))
    }
}

impl Default for LedDriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "serialport")]
fn open_transport(config: &DeviceConfig) -> Result<Box<dyn SerialTransport>, DriverError> {
    use blinky_serial::SerialPortTransport;

    let transport = match &config.port {
        Some(path) => SerialPortTransport::open(path, config.baud_rate)?,
        None => SerialPortTransport::open_by_description(&config.description, config.baud_rate)?,
    };
    info!(
        "Connected to LED driver on {} at {} baud",
        transport.name(),
        config.baud_rate
    );
    Ok(Box::new(transport))
}

#[cfg(not(feature = "serialport"))]
fn open_transport(_config: &DeviceConfig) -> Result<Box<dyn SerialTransport>, DriverError> {
    Err(DriverError::Config(
        "built without the serialport feature; supply a transport explicitly".into(),
    ))
}
