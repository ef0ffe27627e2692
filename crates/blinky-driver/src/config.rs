//! 设备配置
//!
//! 配置文件为 TOML，所有字段都可以省略：
//!
//! ```toml
//! # 显式串口路径；省略时按 USB 产品描述查找
//! port = "/dev/ttyUSB0"
//! description = "Blinky 1.0"
//! baud_rate = 9600
//! read_timeout_ms = 2000
//! write_timeout_ms = 1000
//! poll_interval_ms = 200
//! simulate = false
//!
//! [temperature]
//! mode = "linear"
//! scale = 0.0805664
//! offset = 0.0
//! ```

use crate::error::DriverError;
use crate::temperature::TemperatureCalculation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 设备 USB 产品描述
pub const DEFAULT_DESCRIPTION: &str = "Blinky 1.0";

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// 设备配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// 显式串口路径（优先于 `description`）
    pub port: Option<String>,
    /// 按 USB 产品描述查找设备
    pub description: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// 状态轮询间隔
    pub poll_interval_ms: u64,
    /// 模拟模式（不打开串口）
    pub simulate: bool,
    pub temperature: TemperatureCalculation,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            description: DEFAULT_DESCRIPTION.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 2000,
            write_timeout_ms: 1000,
            poll_interval_ms: 200,
            simulate: false,
            temperature: TemperatureCalculation::default(),
        }
    }
}

impl DeviceConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DriverError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DriverError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, DriverError> {
        toml::to_string_pretty(self)
            .map_err(|e| DriverError::Config(format!("Failed to serialize configuration: {}", e)))
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        if self.baud_rate == 0 {
            return Err(DriverError::Config("baud_rate must be positive".into()));
        }
        if self.read_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(DriverError::Config("timeouts must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(DriverError::Config("poll_interval_ms must be positive".into()));
        }
        if self.port.is_none() && self.description.is_empty() && !self.simulate {
            return Err(DriverError::Config(
                "either port or description is required".into(),
            ));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
