//! 命令标签定义
//!
//! 每条消息以 3 字节标签开头：固定前缀 `05 05` 加一个操作码字节。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 标签固定前缀
pub const TAG_PREFIX: [u8; 2] = [0x05, 0x05];

/// 操作码（标签第 3 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Opcode {
    /// 设置单通道亮度（请求与响应同形）
    SetIntensity = 0x00,
    /// 下载完整采样表
    LoadFile = 0x04,
    /// 设置周期寄存器（回显）
    SetPeriod = 0x06,
    /// 开始 / 停止文件播放
    FilePlayback = 0x07,
    /// 查询是否正在播放
    IsFilePlaying = 0x08,
    /// 热敏电阻读数（也会被设备主动推送）
    ThermistorValues = 0x80,
}

/// 3 字节命令标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 3]);

impl Tag {
    /// 标签长度（字节）
    pub const LEN: usize = 3;

    /// 由操作码构造标签
    pub const fn for_opcode(opcode: Opcode) -> Self {
        Self([TAG_PREFIX[0], TAG_PREFIX[1], opcode as u8])
    }

    /// 从字节切片读取标签（取前 3 字节）
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        match bytes {
            [a, b, c, ..] => Ok(Self([*a, *b, *c])),
            _ => Err(ProtocolError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            }),
        }
    }

    /// 解析操作码
    ///
    /// 前缀不匹配或操作码未知时返回 `UnknownTag`。
    pub fn opcode(&self) -> Result<Opcode, ProtocolError> {
        if self.0[..2] != TAG_PREFIX {
            return Err(ProtocolError::UnknownTag { tag: *self });
        }
        Opcode::try_from(self.0[2]).map_err(|_| ProtocolError::UnknownTag { tag: *self })
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl From<Opcode> for Tag {
    fn from(opcode: Opcode) -> Self {
        Self::for_opcode(opcode)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x} {:02x} {:02x}", self.0[0], self.0[1], self.0[2])
    }
}
