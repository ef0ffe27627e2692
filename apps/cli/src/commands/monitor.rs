//! 监控命令
//!
//! 周期性打印播放状态和后台轮询发布的温度，直到 Ctrl-C。

use crate::utils::{Session, format_temperatures};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub fn execute(session: &Session, frequency: u32, interrupted: &AtomicBool) -> Result<()> {
    let period = Duration::from_secs_f64(1.0 / f64::from(frequency.max(1)));
    println!("📈 监控中（{} Hz），按 Ctrl-C 退出", frequency.max(1));

    while !interrupted.load(Ordering::SeqCst) {
        let temperatures = session
            .driver
            .last_temperatures()
            .map(|t| format_temperatures(&t))
            .unwrap_or_else(|| "（暂无温度读数）".to_string());
        println!("[{:>10}] {}", session.driver.state(), temperatures);
        std::thread::sleep(period);
    }
    Ok(())
}
