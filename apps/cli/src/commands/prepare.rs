//! 准备命令
//!
//! 只下载周期和采样表，不开始播放。

use crate::utils::Session;
use crate::validation::{parse_channels, parse_duration, parse_intensity};
use anyhow::Result;
use clap::Args;

/// 准备命令参数
#[derive(Args, Debug)]
pub struct PrepareCommand {
    /// 播放时长（如 100us、250ms、1.5s；无后缀按毫秒）
    #[arg(short, long, value_parser = parse_duration)]
    pub duration: u64,

    /// 通道列表（如 1,2,5-8 或 all）
    #[arg(short, long)]
    pub channels: Option<String>,

    /// 亮度 [0, 1]
    #[arg(short, long, default_value = "1.0", value_parser = parse_intensity)]
    pub intensity: f64,
}

impl PrepareCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        if let Some(channels) = &self.channels {
            let channels = parse_channels(channels)?;
            session.driver.set_intensity(&channels, self.intensity)?;
        }

        let timeline = session.driver.prepare(self.duration)?;
        println!(
            "✅ 已下载：周期 {} ticks（{} us）× {} 个采样 = {} us",
            timeline.period,
            timeline.period_us(),
            timeline.samples_used,
            timeline.duration_us()
        );
        Ok(())
    }
}
