//! # Blinky Protocol
//!
//! LED 驱动器串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 设备常量（通道数、采样表长度、周期步进）
//! - `ids`: 命令标签（3 字节 tag）与操作码
//! - `frame`: 帧编码/解码与校验和
//! - `messages`: 各命令的消息体与请求/响应描述表
//!
//! ## 帧格式
//!
//! ```text
//! [tag: 3 bytes][body: N bytes][checksum: 1 byte]
//! ```
//!
//! - 没有长度字段和分隔符，每种消息的长度在编译期确定
//! - checksum = 之前所有字节之和 mod 256
//!
//! ## 字节序
//!
//! 16 位字段在线路上使用大端字节序（高位在前），与主机字节序无关。
//! 本模块提供了字节序转换工具函数。

pub mod constants;
pub mod frame;
pub mod ids;
pub mod messages;

// 重新导出常用类型
pub use constants::*;
pub use frame::{Decoded, RawFrame, checksum, decode, encode, frame_len};
pub use ids::{Opcode, Tag};
pub use messages::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unknown command tag: {tag}")]
    UnknownTag { tag: Tag },

    #[error("Checksum mismatch for {tag}: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { tag: Tag, expected: u8, actual: u8 },
}

/// 大端字节序转 u16
pub fn bytes_to_u16_be(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// u16 转大端字节序
pub fn u16_to_bytes_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// 将 [0, 1] 范围内的亮度线性映射到 16 位满量程
///
/// 超出范围的值会被钳位；调用者应事先校验输入。
pub fn intensity_to_raw(value: f64) -> u16 {
    (value.clamp(0.0, 1.0) * f64::from(u16::MAX)).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_u16_be() {
        assert_eq!(bytes_to_u16_be([0x12, 0x34]), 0x1234);
        assert_eq!(bytes_to_u16_be([0xFF, 0x00]), 0xFF00);
    }

    #[test]
    fn test_u16_to_bytes_be() {
        assert_eq!(u16_to_bytes_be(0x1234), [0x12, 0x34]);
        assert_eq!(u16_to_bytes_be(1), [0x00, 0x01]);
    }

    #[test]
    fn test_intensity_to_raw() {
        assert_eq!(intensity_to_raw(0.0), 0);
        assert_eq!(intensity_to_raw(1.0), u16::MAX);
        // round(0.5 * 65535) = round(32767.5) = 32768
        assert_eq!(intensity_to_raw(0.5), 32768);
        assert_eq!(intensity_to_raw(0.25), 16384);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 7,
            actual: 3,
        };
        assert_eq!(format!("{}", err), "Invalid frame length: expected 7, got 3");

        let err = ProtocolError::ChecksumMismatch {
            tag: Tag::for_opcode(Opcode::SetPeriod),
            expected: 0x10,
            actual: 0x11,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("05 05 06"), "message: {}", msg);
        assert!(msg.contains("0x10") && msg.contains("0x11"));
    }
}
