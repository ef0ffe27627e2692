//! 播放命令
//!
//! 设置亮度、下载时间线并开始播放，等待播放结束。Ctrl-C 时停止播放。

use crate::utils::{Session, wait_until};
use crate::validation::{parse_channels, parse_duration, parse_intensity};
use anyhow::Result;
use blinky_driver::PlaybackState;
use clap::Args;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// 播放命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 播放时长（如 100us、250ms、1.5s；无后缀按毫秒）
    #[arg(short, long, value_parser = parse_duration)]
    pub duration: u64,

    /// 通道列表（如 1,2,5-8 或 all）；省略时使用当前亮度表
    #[arg(short, long)]
    pub channels: Option<String>,

    /// 亮度 [0, 1]
    #[arg(short, long, default_value = "1.0", value_parser = parse_intensity)]
    pub intensity: f64,
}

impl RunCommand {
    pub fn execute(&self, session: &Session, interrupted: &AtomicBool) -> Result<()> {
        let driver = &session.driver;

        if let Some(channels) = &self.channels {
            let channels = parse_channels(channels)?;
            driver.set_intensity(&channels, self.intensity)?;
            println!("💡 {} 个通道亮度设为 {:.3}", channels.len(), self.intensity);
        }

        let timeline = driver.run(self.duration)?;
        println!(
            "▶️  播放中：{} us（周期 {} us × {} 个采样）",
            self.duration,
            timeline.period_us(),
            timeline.samples_used
        );

        let finished = wait_until(interrupted, Duration::from_millis(20), || {
            driver.state() != PlaybackState::Playing
        });

        if finished {
            println!("✅ 播放结束");
        } else {
            driver.stop()?;
            println!("🛑 已停止播放");
        }
        Ok(())
    }
}
