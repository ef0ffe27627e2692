//! 测试辅助函数

use super::mock_device::MockLedBox;
use blinky_driver::{
    HostVariable, LedDriver, LedDriverBuilder, ManualClock, ManualScheduler, MemoryVariable,
    TemperatureCalculation,
};
use blinky_serial::MockHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 连接到 Mock 设备的驱动，轮询由测试手动触发
pub struct TestRig {
    pub driver: LedDriver,
    pub device: MockLedBox,
    pub handle: MockHandle,
    pub scheduler: ManualScheduler,
    pub running: Arc<MemoryVariable>,
    pub temperatures: [Arc<MemoryVariable>; 4],
}

impl TestRig {
    pub fn hardware() -> Self {
        let device = MockLedBox::new();
        let (transport, handle) = device.connect();
        Self::build(device, handle, LedDriverBuilder::new().transport(transport))
    }

    pub fn simulated(clock: Arc<ManualClock>) -> Self {
        let device = MockLedBox::new();
        let (_transport, handle) = device.connect();
        Self::build(
            device,
            handle,
            LedDriverBuilder::new().simulate(true).clock(clock),
        )
    }

    fn build(device: MockLedBox, handle: MockHandle, builder: LedDriverBuilder) -> Self {
        let scheduler = ManualScheduler::new();
        let running = MemoryVariable::new("running");
        let temperatures = ["temp_a", "temp_b", "temp_c", "temp_d"].map(MemoryVariable::new);

        let mut builder = builder
            .scheduler(Arc::new(scheduler.clone()))
            .temperature(TemperatureCalculation::Raw)
            .running_variable(running.clone());
        for (index, var) in temperatures.iter().enumerate() {
            let var: Arc<dyn HostVariable> = var.clone();
            builder = builder.temperature_variable(index, var);
        }

        let driver = builder.build().expect("driver should build");
        Self {
            driver,
            device,
            handle,
            scheduler,
            running,
            temperatures,
        }
    }

    /// 执行一个轮询周期
    pub fn poll(&self) {
        self.scheduler.run_pending();
    }
}

/// 等待条件满足（带超时）
pub fn wait_for_condition<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}
