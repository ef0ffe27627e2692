//! 亮度命令
//!
//! 立即把亮度写入设备（逐通道交换）。

use crate::utils::Session;
use crate::validation::{parse_channels, parse_intensity};
use anyhow::Result;
use clap::Args;

/// 亮度命令参数
#[derive(Args, Debug)]
pub struct IntensityCommand {
    /// 通道列表（如 1,2,5-8 或 all）
    pub channels: String,

    /// 亮度 [0, 1]
    #[arg(value_parser = parse_intensity)]
    pub value: f64,
}

impl IntensityCommand {
    pub fn execute(&self, session: &Session) -> Result<()> {
        let channels = parse_channels(&self.channels)?;
        session.driver.write_intensity(&channels, self.value)?;
        println!("💡 {} 个通道亮度设为 {:.3}", channels.len(), self.value);
        Ok(())
    }
}
