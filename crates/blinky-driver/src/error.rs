//! 驱动层错误类型定义

use blinky_protocol::{ProtocolError, Tag};
use blinky_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
///
/// 所有硬件 / 协议错误对宿主进程都是非致命的：调用返回错误并记录日志，
/// 设备状态保持不变。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口传输错误（打开失败、读写超时、不完整传输）
    #[error("Serial transport error: {0}")]
    Serial(#[from] SerialError),

    /// 帧解析错误（含校验和错误）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 收到既不是预期响应也不是遥测的消息（已尝试清空接收缓冲区）
    #[error("Unexpected message: expected {expected}, received {actual}")]
    UnexpectedTag { expected: Tag, actual: Tag },

    /// 时长越界或不是步进的整数倍
    #[error(
        "Invalid duration: {duration_us} us (must be between {min_us} and {max_us} us, in multiples of {step_us} us)"
    )]
    InvalidDuration {
        duration_us: u64,
        min_us: u64,
        max_us: u64,
        step_us: u64,
    },

    /// 找不到能整除时长的周期
    #[error("Incompatible duration: no integral period for {duration_us} us")]
    IncompatibleDuration { duration_us: u64 },

    /// 播放中再次 run / prepare
    #[error("LED driver is already running")]
    AlreadyRunning,

    /// 通道号超出范围
    #[error("Invalid channel number: {channel} (valid range is 1-{max})")]
    InvalidChannel { channel: usize, max: usize },

    /// 亮度超出 [0, 1]
    #[error("Invalid intensity: {0} (must be between 0 and 1)")]
    InvalidIntensity(f64),

    /// 设备没有确认命令（回显不符或标志位为假）
    #[error("LED driver rejected {command}: {detail}")]
    Rejected {
        command: &'static str,
        detail: String,
    },

    /// 设备正在关闭
    #[error("LED driver is shutting down")]
    ShuttingDown,

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DriverError {
    pub(crate) fn rejected(command: &'static str, detail: impl Into<String>) -> Self {
        Self::Rejected {
            command,
            detail: detail.into(),
        }
    }
}
