//! # Blinky Serial Transport Layer
//!
//! 串口传输抽象层，提供协议层所需的 I/O 原语：
//!
//! - 打开 / 关闭具名串口设备（关闭由 `Drop` 完成）
//! - 配置读写超时
//! - 有界同步读写（`read(n)` / `write(n)`）
//! - 查询接收队列中的待读字节数
//! - 清空接收缓冲区
//!
//! 真实后端见 [`SerialPortTransport`]（feature `serialport`，默认开启），
//! 测试后端见 `mock` 模块（feature `mock`）。

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serialport")]
pub mod port;

#[cfg(feature = "serialport")]
pub use port::SerialPortTransport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockHandle, MockTransport};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot open device: {0}")]
    Open(#[from] SerialDeviceError),
    /// 已打开设备上的后端错误（清空缓冲、查询队列、设置超时）
    #[error("Device error: {0}")]
    Device(SerialDeviceError),
    #[error("Timeout: no bytes transferred")]
    Timeout,
    #[error("Incomplete read (requested {expected} bytes, read {actual})")]
    ShortRead { expected: usize, actual: usize },
    #[error("Incomplete write (attempted {expected} bytes, wrote {actual})")]
    ShortWrite { expected: usize, actual: usize },
    #[error("Device closed")]
    Closed,
}

impl SerialError {
    /// 是否属于超时类错误（读写未在超时内完成）
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SerialError::Timeout | SerialError::ShortRead { .. } | SerialError::ShortWrite { .. }
        )
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDeviceErrorKind {
    Unknown,
    NotFound,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SerialDeviceError {
    pub kind: SerialDeviceErrorKind,
    pub message: String,
}

impl SerialDeviceError {
    pub fn new(kind: SerialDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SerialDeviceErrorKind::NotFound | SerialDeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for SerialDeviceError {
    fn from(message: String) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SerialDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

/// 串口传输原语
///
/// `read` / `write` 返回实际传输的字节数，少于请求值表示超时已到。
/// `read_exact` / `write_all` 将不完整的传输转换为错误。
pub trait SerialTransport: Send {
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError>;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// 接收队列中已到达、尚未读取的字节数
    fn bytes_available(&mut self) -> Result<usize, SerialError>;

    /// 丢弃接收缓冲区中的全部数据
    fn purge_rx(&mut self) -> Result<(), SerialError>;

    fn set_timeouts(&mut self, _read: Duration, _write: Duration) -> Result<(), SerialError> {
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        match self.write(data)? {
            n if n == data.len() => Ok(()),
            0 => Err(SerialError::Timeout),
            n => Err(SerialError::ShortWrite {
                expected: data.len(),
                actual: n,
            }),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SerialError> {
        let expected = buf.len();
        match self.read(buf)? {
            n if n == expected => Ok(()),
            0 => Err(SerialError::Timeout),
            n => Err(SerialError::ShortRead {
                expected,
                actual: n,
            }),
        }
    }
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        (**self).read(buf)
    }

    fn bytes_available(&mut self) -> Result<usize, SerialError> {
        (**self).bytes_available()
    }

    fn purge_rx(&mut self) -> Result<(), SerialError> {
        (**self).purge_rx()
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<(), SerialError> {
        (**self).set_timeouts(read, write)
    }
}
