//! LED 驱动器设备
//!
//! [`LedDriver`] 是宿主进程使用的句柄，可以在线程间共享（`&LedDriver` 即可调用全部操作）。
//! 所有设备操作（包括后台轮询）都在同一把锁内执行，所以线路上的请求 /
//! 响应交换永远不会交错。
//!
//! # 关闭顺序
//!
//! 1. 取消轮询令牌
//! 2. 在不持有设备锁的情况下取消并等待轮询任务
//! 3. 持锁：播放中则停止播放，然后关闭串口

use crate::clock::Clock;
use crate::error::DriverError;
use crate::link::Link;
use crate::mode::DriverMode;
use crate::playback::{PlaybackState, PlaybackTracker};
use crate::poller::{PollToken, TelemetryPublisher};
use crate::scheduler::{ScheduledTask, TaskScheduler};
use crate::temperature::Temperatures;
use crate::timeline::{Timeline, quantize};
use crate::variables::HostBindings;
use blinky_protocol::{
    ChannelIntensity, Empty, FilePlayback, Flag, IntensityTable, IsFilePlaying, LoadFile,
    NUM_CHANNELS, Period, ReadThermistors, SampleTable, SetIntensity, SetPeriod, intensity_to_raw,
};
use blinky_serial::SerialTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub(crate) type BoxedLink = Link<Box<dyn SerialTransport>>;

/// 锁内状态
pub(crate) struct DriverCore {
    mode: DriverMode,
    link: Option<BoxedLink>,
    intensities: IntensityTable,
    playback: PlaybackTracker,
    bindings: HostBindings,
    publisher: TelemetryPublisher,
    clock: Arc<dyn Clock>,
    closed: bool,
}

impl DriverCore {
    pub(crate) fn new(
        mode: DriverMode,
        link: Option<BoxedLink>,
        bindings: HostBindings,
        publisher: TelemetryPublisher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            mode,
            link,
            intensities: IntensityTable::default(),
            playback: PlaybackTracker::default(),
            bindings,
            publisher,
            clock,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::ShuttingDown);
        }
        Ok(())
    }

    /// 硬件模式下的串口连接
    fn link(&mut self) -> Result<&mut BoxedLink, DriverError> {
        self.link.as_mut().ok_or(DriverError::ShuttingDown)
    }

    /// 校验亮度和全部通道，任何一个无效都不做修改
    fn validate_intensity(channels: &[usize], value: f64) -> Result<(), DriverError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(DriverError::InvalidIntensity(value));
        }
        if let Some(&channel) = channels
            .iter()
            .find(|channel| !IntensityTable::is_valid_channel(**channel))
        {
            return Err(DriverError::InvalidChannel {
                channel,
                max: NUM_CHANNELS,
            });
        }
        Ok(())
    }

    fn set_intensity(&mut self, channels: &[usize], value: f64) -> Result<bool, DriverError> {
        Self::validate_intensity(channels, value)?;
        Ok(self.commit_intensity(channels, value))
    }

    fn commit_intensity(&mut self, channels: &[usize], value: f64) -> bool {
        let mut changed = false;
        for &channel in channels {
            changed |= self.intensities.set(channel, value).unwrap_or(false);
        }
        if changed {
            self.playback.mark_intensity_changed();
        }
        changed
    }

    /// 逐通道写入设备，全部回显确认后才更新亮度表
    fn write_intensity(&mut self, channels: &[usize], value: f64) -> Result<(), DriverError> {
        self.ensure_open()?;
        Self::validate_intensity(channels, value)?;

        if !self.mode.is_simulated() {
            let raw = intensity_to_raw(value);
            let link = self.link()?;
            for &channel in channels {
                let expected = ChannelIntensity {
                    channel: channel as u8,
                    intensity: raw,
                };
                let mut message = expected;
                link.perform::<SetIntensity, _>(&mut message)?;
                if message != expected {
                    return Err(DriverError::rejected(
                        "set intensity",
                        format!("echoed {:?}, expected {:?}", message, expected),
                    ));
                }
            }
        }

        self.commit_intensity(channels, value);
        Ok(())
    }

    fn prepare(&mut self, duration_us: u64) -> Result<Timeline, DriverError> {
        self.ensure_open()?;
        if self.playback.is_playing() {
            return Err(DriverError::AlreadyRunning);
        }

        let timeline = quantize(duration_us)?;
        if !self.playback.needs_reload(duration_us) {
            debug!("Sample table for {} us already loaded", duration_us);
            self.playback.mark_ready();
            return Ok(timeline);
        }

        if let Err(e) = self.load(timeline) {
            self.playback.invalidate();
            return Err(e);
        }
        self.playback.mark_loaded(duration_us, timeline);
        info!(
            "Loaded {} us timeline: period {} ticks x {} samples",
            duration_us, timeline.period, timeline.samples_used
        );
        Ok(timeline)
    }

    /// 下发周期，再下载采样表
    fn load(&mut self, timeline: Timeline) -> Result<(), DriverError> {
        if self.mode.is_simulated() {
            return Ok(());
        }

        let table = SampleTable::from_intensities(&self.intensities, timeline.samples_used);
        let link = self.link()?;

        let mut period = Period {
            ticks: timeline.period,
        };
        link.perform::<SetPeriod, _>(&mut period)?;
        if period.ticks != timeline.period {
            return Err(DriverError::rejected(
                "set period",
                format!("echoed {} ticks, expected {}", period.ticks, timeline.period),
            ));
        }

        let Flag(loaded) = link.exchange::<LoadFile>(&table)?;
        if !loaded {
            return Err(DriverError::rejected("load file", "file not loaded"));
        }
        Ok(())
    }

    fn run(&mut self, duration_us: u64) -> Result<Timeline, DriverError> {
        self.ensure_open()?;
        if self.playback.is_playing() {
            return Err(DriverError::AlreadyRunning);
        }

        let timeline = self.prepare(duration_us)?;

        if !self.mode.is_simulated() {
            let Flag(playing) = self.link()?.exchange::<FilePlayback>(&Flag(true))?;
            if !playing {
                return Err(DriverError::rejected("start playback", "playback not started"));
            }
        }

        self.playback.mark_started(self.clock.now_us());
        self.bindings.set_running(true);
        info!("Playback started ({} us)", duration_us);
        Ok(timeline)
    }

    /// 只在播放中时下发停止命令；空闲时不产生任何线路流量
    fn stop(&mut self) -> Result<(), DriverError> {
        self.ensure_open()?;
        if !self.playback.is_playing() {
            return Ok(());
        }

        if !self.mode.is_simulated() {
            let Flag(playing) = self.link()?.exchange::<FilePlayback>(&Flag(false))?;
            if playing {
                return Err(DriverError::rejected("stop playback", "still playing"));
            }
        }

        self.playback.mark_finished();
        self.bindings.set_running(false);
        info!("Playback stopped");
        Ok(())
    }

    fn read_temperatures(&mut self) -> Result<Option<Temperatures>, DriverError> {
        self.ensure_open()?;
        if self.mode.is_simulated() {
            return Ok(None);
        }

        let link = self.link()?;
        // 排空失败不影响本次读取
        if let Err(e) = link.drain_pending() {
            warn!("Failed to drain pending telemetry: {}", e);
        }
        let raw = link.exchange::<ReadThermistors>(&Empty)?;
        Ok(Some(self.publisher.publish(raw)))
    }

    /// 一个轮询周期
    ///
    /// 失败只记录日志，不改变状态。
    pub(crate) fn poll(&mut self, token: &PollToken) {
        if token.is_cancelled() || self.closed {
            return;
        }

        if self.playback.is_playing() {
            match self.playback_finished() {
                Ok(true) => {
                    self.playback.mark_finished();
                    self.bindings.set_running(false);
                    info!("Playback finished");
                },
                Ok(false) => {},
                Err(e) => warn!("Failed to query playback state: {}", e),
            }
        }

        if let Err(e) = self.read_temperatures() {
            warn!("Failed to read thermistor values: {}", e);
        }
    }

    fn playback_finished(&mut self) -> Result<bool, DriverError> {
        if self.mode.is_simulated() {
            return Ok(self.playback.simulated_run_elapsed(self.clock.now_us()));
        }
        let Flag(playing) = self.link()?.exchange::<IsFilePlaying>(&Flag(false))?;
        Ok(!playing)
    }

    /// 停止播放并关闭串口（持锁调用）
    fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.stop() {
            error!("Failed to stop playback during shutdown: {}", e);
        }
        self.closed = true;
        // drop 即关闭串口
        self.link = None;
    }
}

/// LED 驱动器句柄
///
/// 由 [`LedDriverBuilder`](crate::LedDriverBuilder) 创建。所有方法的失败都会
/// 记录日志并返回错误；失败不会改变播放状态。
///
/// # Example
///
/// ```no_run
/// use blinky_driver::LedDriverBuilder;
///
/// let driver = LedDriverBuilder::new().build()?;
/// driver.set_intensity(&[1, 2, 3], 0.5)?;
/// driver.run(1_000_000)?;
/// # Ok::<(), blinky_driver::DriverError>(())
/// ```
pub struct LedDriver {
    core: Arc<Mutex<DriverCore>>,
    token: PollToken,
    poll_task: Mutex<Option<Box<dyn ScheduledTask>>>,
    publisher: TelemetryPublisher,
    mode: DriverMode,
}

impl LedDriver {
    /// 创建句柄并启动轮询任务（内部方法，由 Builder 调用）
    pub(crate) fn start(
        core: DriverCore,
        publisher: TelemetryPublisher,
        scheduler: &dyn TaskScheduler,
        poll_interval: Duration,
    ) -> Self {
        let mode = core.mode;
        let core = Arc::new(Mutex::new(core));
        let token = PollToken::new();

        let poll_core = core.clone();
        let poll_token = token.clone();
        let task = scheduler.schedule(
            poll_interval,
            Box::new(move || poll_core.lock().poll(&poll_token)),
        );
        debug!("Status poller scheduled every {:?}", poll_interval);

        Self {
            core,
            token,
            poll_task: Mutex::new(Some(task)),
            publisher,
            mode,
        }
    }

    /// 设置通道亮度（只改主机侧亮度表，下次 prepare 时生效）
    ///
    /// 通道号从 1 开始。任一通道无效或亮度不在 [0, 1] 时不做任何修改。
    pub fn set_intensity(&self, channels: &[usize], value: f64) -> Result<(), DriverError> {
        let result = self.core.lock().set_intensity(channels, value);
        logged("set intensity", result.map(|_| ()))
    }

    /// 设置通道亮度并立即逐通道写入设备
    pub fn write_intensity(&self, channels: &[usize], value: f64) -> Result<(), DriverError> {
        let result = self.core.lock().write_intensity(channels, value);
        logged("write intensity", result)
    }

    /// 量化时长并下载周期和采样表
    ///
    /// 亮度和时长都没有变化时不会重新下载。播放中返回 `AlreadyRunning`。
    pub fn prepare(&self, duration_us: u64) -> Result<Timeline, DriverError> {
        let result = self.core.lock().prepare(duration_us);
        logged("prepare", result)
    }

    /// prepare 后开始播放，并把 `running` 变量置为 `true`
    pub fn run(&self, duration_us: u64) -> Result<Timeline, DriverError> {
        let result = self.core.lock().run(duration_us);
        logged("run", result)
    }

    /// 停止播放（空闲时什么也不做）
    pub fn stop(&self) -> Result<(), DriverError> {
        let result = self.core.lock().stop();
        logged("stop", result)
    }

    /// 立即读取一次热敏电阻（模拟模式下返回 `None`）
    pub fn read_temperatures(&self) -> Result<Option<Temperatures>, DriverError> {
        let result = self.core.lock().read_temperatures();
        logged("read temperatures", result)
    }

    /// 在当前线程执行一个轮询周期
    pub fn poll_now(&self) {
        self.core.lock().poll(&self.token);
    }

    pub fn state(&self) -> PlaybackState {
        self.core.lock().playback.state()
    }

    /// 最近一次下载的时间线
    pub fn timeline(&self) -> Option<Timeline> {
        self.core.lock().playback.timeline()
    }

    /// 通道的 16 位原始亮度
    pub fn intensity(&self, channel: usize) -> Option<u16> {
        self.core.lock().intensities.get(channel)
    }

    /// 最近一次发布的温度（无锁读取）
    pub fn last_temperatures(&self) -> Option<Temperatures> {
        self.publisher.last()
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    /// 关闭设备（等价于 drop）
    pub fn close(self) {}
}

impl Drop for LedDriver {
    fn drop(&mut self) {
        self.token.cancel();

        let task = self.poll_task.lock().take();
        if let Some(mut task) = task {
            task.cancel();
        }

        self.core.lock().close();
        info!("LED driver closed");
    }
}

fn logged<T>(operation: &str, result: Result<T, DriverError>) -> Result<T, DriverError> {
    if let Err(e) = &result {
        error!("LED driver {} failed: {}", operation, e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::scheduler::ManualScheduler;
    use crate::temperature::TemperatureCalculation;

    fn simulated(clock: Arc<ManualClock>) -> (LedDriver, ManualScheduler) {
        let publisher = TelemetryPublisher::new(TemperatureCalculation::Raw, HostBindings::default());
        let core = DriverCore::new(
            DriverMode::Simulated,
            None,
            HostBindings::default(),
            publisher.clone(),
            clock,
        );
        let scheduler = ManualScheduler::new();
        let driver = LedDriver::start(core, publisher, &scheduler, Duration::from_millis(200));
        (driver, scheduler)
    }

    #[test]
    fn test_invalid_channel_mutates_nothing() {
        let (driver, _) = simulated(Arc::new(ManualClock::new()));
        let err = driver.set_intensity(&[1, 2, 65], 0.5).unwrap_err();
        assert!(matches!(err, DriverError::InvalidChannel { channel: 65, max: 64 }));
        assert_eq!(driver.intensity(1), Some(0));
        assert_eq!(driver.intensity(2), Some(0));
    }

    #[test]
    fn test_invalid_intensity() {
        let (driver, _) = simulated(Arc::new(ManualClock::new()));
        for bad in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                driver.set_intensity(&[1], bad),
                Err(DriverError::InvalidIntensity(_))
            ));
        }
        assert_eq!(driver.intensity(1), Some(0));
    }

    #[test]
    fn test_simulated_run_ends_by_clock() {
        let clock = Arc::new(ManualClock::new());
        let (driver, scheduler) = simulated(clock.clone());

        driver.set_intensity(&[1], 1.0).unwrap();
        driver.run(10_000).unwrap();
        assert_eq!(driver.state(), PlaybackState::Playing);
        assert!(matches!(driver.run(10_000), Err(DriverError::AlreadyRunning)));

        clock.advance(9_999);
        scheduler.run_pending();
        assert_eq!(driver.state(), PlaybackState::Playing);

        clock.advance(1);
        scheduler.run_pending();
        assert_eq!(driver.state(), PlaybackState::Idle);
        assert!(driver.last_temperatures().is_none());
    }

    #[test]
    fn test_drop_cancels_poller() {
        let (driver, scheduler) = simulated(Arc::new(ManualClock::new()));
        assert_eq!(scheduler.active_tasks(), 1);
        drop(driver);
        assert_eq!(scheduler.active_tasks(), 0);
    }
}
