//! 温度读取命令

use crate::utils::{Session, format_temperatures};
use anyhow::Result;

pub fn execute(session: &Session) -> Result<()> {
    match session.driver.read_temperatures()? {
        Some(temperatures) => {
            println!("🌡️  {}", format_temperatures(&temperatures));
            println!("    raw {:?}", temperatures.raw.raw);
        },
        None => println!("（模拟模式下没有温度读数）"),
    }
    Ok(())
}
