//! `serialport` 后端
//!
//! 通过 USB 串口打开 LED 驱动器。设备可以按路径打开，也可以按 USB
//! 产品描述字符串（如 `"Blinky 1.0"`）查找。

use crate::{SerialDeviceError, SerialDeviceErrorKind, SerialError, SerialTransport};
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 默认读超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// 默认写超时
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// 基于 `serialport` 的传输实现
pub struct SerialPortTransport {
    port: Box<dyn SerialPort>,
    name: String,
    read_timeout: Duration,
    write_timeout: Duration,
    /// 当前下发给驱动的超时（serialport 只有一个超时值）
    active_timeout: Duration,
}

impl SerialPortTransport {
    /// 按路径打开串口
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud_rate)
            .timeout(DEFAULT_READ_TIMEOUT)
            .open()
            .map_err(|e| SerialError::Open(map_open_error(path, e)))?;

        debug!("Opened serial port {} at {} baud", path, baud_rate);

        Ok(Self {
            port,
            name: path.to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            active_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// 按 USB 产品描述查找并打开串口
    pub fn open_by_description(description: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let path = find_port_by_description(description)?;
        Self::open(&path, baud_rate)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn apply_timeout(&mut self, timeout: Duration) -> Result<(), SerialError> {
        if self.active_timeout != timeout {
            self.port.set_timeout(timeout).map_err(backend_error)?;
            self.active_timeout = timeout;
        }
        Ok(())
    }
}

/// 枚举系统串口，返回产品描述匹配的第一个 USB 串口路径
pub fn find_port_by_description(description: &str) -> Result<String, SerialError> {
    let ports = serialport::available_ports().map_err(enumerate_error)?;
    ports
        .into_iter()
        .find(|p| {
            matches!(&p.port_type, SerialPortType::UsbPort(info)
                if info.product.as_deref() == Some(description))
        })
        .map(|p| p.port_name)
        .ok_or_else(|| {
            SerialError::Open(SerialDeviceError::new(
                SerialDeviceErrorKind::NotFound,
                format!("No USB serial device with description {:?}", description),
            ))
        })
}

fn map_open_error(path: &str, e: serialport::Error) -> SerialDeviceError {
    let kind = match e.kind() {
        serialport::ErrorKind::NoDevice => SerialDeviceErrorKind::NotFound,
        serialport::ErrorKind::InvalidInput => SerialDeviceErrorKind::UnsupportedConfig,
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => SerialDeviceErrorKind::NotFound,
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            SerialDeviceErrorKind::AccessDenied
        },
        serialport::ErrorKind::Io(io::ErrorKind::ResourceBusy) => SerialDeviceErrorKind::Busy,
        _ => SerialDeviceErrorKind::Unknown,
    };
    SerialDeviceError::new(kind, format!("{}: {}", path, e))
}

/// 枚举串口失败，属于打开阶段
fn enumerate_error(e: serialport::Error) -> SerialError {
    SerialError::Open(SerialDeviceError::new(
        SerialDeviceErrorKind::Backend,
        e.to_string(),
    ))
}

/// 已打开端口上的运行期错误
fn backend_error(e: serialport::Error) -> SerialError {
    match e.kind() {
        serialport::ErrorKind::Io(kind) => SerialError::Io(io::Error::new(kind, e.description)),
        _ => SerialError::Device(SerialDeviceError::new(
            SerialDeviceErrorKind::Backend,
            e.to_string(),
        )),
    }
}

impl SerialTransport for SerialPortTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        self.apply_timeout(self.write_timeout)?;
        let deadline = Instant::now() + self.write_timeout;
        let mut written = 0;

        while written < data.len() {
            match self.port.write(&data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        self.port.flush()?;
        trace!("Wrote {}/{} bytes to {}", written, data.len(), self.name);
        Ok(written)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let deadline = Instant::now() + self.read_timeout;
        let mut filled = 0;

        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.apply_timeout(remaining)?;
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) => return Err(e.into()),
            }
        }

        trace!("Read {}/{} bytes from {}", filled, buf.len(), self.name);
        Ok(filled)
    }

    fn bytes_available(&mut self) -> Result<usize, SerialError> {
        let n = self.port.bytes_to_read().map_err(backend_error)?;
        Ok(n as usize)
    }

    fn purge_rx(&mut self) -> Result<(), SerialError> {
        self.port.clear(ClearBuffer::Input).map_err(backend_error)
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<(), SerialError> {
        self.read_timeout = read;
        self.write_timeout = write;
        self.apply_timeout(read)
    }
}

impl Drop for SerialPortTransport {
    fn drop(&mut self) {
        debug!("Closing serial port {}", self.name);
    }
}
