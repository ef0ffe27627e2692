//! 停止命令

use crate::utils::Session;
use anyhow::Result;

pub fn execute(session: &Session) -> Result<()> {
    println!("🛑 发送停止播放命令...");
    session.driver.stop()?;
    println!("✅ 已停止");
    Ok(())
}
