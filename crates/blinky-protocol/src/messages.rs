//! 消息体与命令描述表
//!
//! 每个命令由 [`Command`] 描述：操作码、请求体类型、响应体类型。
//! 接收方向使用 [`Response`] 这个带标签的和类型：先读标签，再按标签
//! 解码对应长度的消息体。

use crate::constants::{NUM_CHANNELS, NUM_SAMPLES};
use crate::ids::{Opcode, Tag};
use crate::{ProtocolError, intensity_to_raw};
use bytes::{Buf, BufMut, BytesMut};

/// 固定长度的消息体
///
/// 多字节字段一律按大端写入（`BufMut::put_u16` / `Buf::get_u16`）。
pub trait WireBody: Sized {
    /// 消息体长度（字节）
    const LEN: usize;

    /// 追加恰好 `LEN` 字节到 `buf`
    fn encode_into(&self, buf: &mut BytesMut);

    /// 从恰好 `LEN` 字节的切片解码
    fn decode(body: &[u8]) -> Result<Self, ProtocolError>;
}

fn check_len<B: WireBody>(body: &[u8]) -> Result<(), ProtocolError> {
    if body.len() != B::LEN {
        return Err(ProtocolError::InvalidLength {
            expected: B::LEN,
            actual: body.len(),
        });
    }
    Ok(())
}

/// 空消息体（热敏电阻读数请求）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Empty;

impl WireBody for Empty {
    const LEN: usize = 0;

    fn encode_into(&self, _buf: &mut BytesMut) {}

    fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        check_len::<Self>(body)?;
        Ok(Empty)
    }
}

/// 单字节布尔标志（fileLoaded / filePlayStarted / filePlaying）
///
/// 解码时任何非零字节都视为 `true`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flag(pub bool);

impl WireBody for Flag {
    const LEN: usize = 1;

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(u8::from(self.0));
    }

    fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        check_len::<Self>(body)?;
        Ok(Flag(body[0] != 0))
    }
}

/// 单通道亮度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelIntensity {
    /// 通道号（1 起始）
    pub channel: u8,
    /// 16 位原始亮度
    pub intensity: u16,
}

impl WireBody for ChannelIntensity {
    const LEN: usize = 3;

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.channel);
        buf.put_u16(self.intensity);
    }

    fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        check_len::<Self>(body)?;
        let mut body = body;
        Ok(Self {
            channel: body.get_u8(),
            intensity: body.get_u16(),
        })
    }
}

/// 周期寄存器（单位：tick，即 `PERIOD_INCREMENT_US`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub ticks: u16,
}

impl WireBody for Period {
    const LEN: usize = 2;

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u16(self.ticks);
    }

    fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        check_len::<Self>(body)?;
        let mut body = body;
        Ok(Self {
            ticks: body.get_u16(),
        })
    }
}

/// 四路热敏电阻原始读数（A、B、C、D）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThermistorValues {
    pub raw: [u16; 4],
}

impl WireBody for ThermistorValues {
    const LEN: usize = 8;

    fn encode_into(&self, buf: &mut BytesMut) {
        for value in self.raw {
            buf.put_u16(value);
        }
    }

    fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        check_len::<Self>(body)?;
        let mut body = body;
        let mut raw = [0u16; 4];
        for value in raw.iter_mut() {
            *value = body.get_u16();
        }
        Ok(Self { raw })
    }
}

/// 每通道亮度表（主机侧，通道 1 对应下标 0）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityTable {
    values: [u16; NUM_CHANNELS],
}

impl Default for IntensityTable {
    fn default() -> Self {
        Self {
            values: [0; NUM_CHANNELS],
        }
    }
}

impl IntensityTable {
    /// 通道号是否有效（1..=NUM_CHANNELS）
    pub fn is_valid_channel(channel: usize) -> bool {
        (1..=NUM_CHANNELS).contains(&channel)
    }

    /// 读取通道原始亮度；通道号无效时返回 `None`
    pub fn get(&self, channel: usize) -> Option<u16> {
        Self::is_valid_channel(channel).then(|| self.values[channel - 1])
    }

    /// 设置通道亮度（[0, 1] 浮点值）
    ///
    /// 返回值表示该通道的原始值是否发生变化；通道号无效时返回 `None` 且不做修改。
    pub fn set(&mut self, channel: usize, value: f64) -> Option<bool> {
        if !Self::is_valid_channel(channel) {
            return None;
        }
        let raw = intensity_to_raw(value);
        let slot = &mut self.values[channel - 1];
        let changed = *slot != raw;
        *slot = raw;
        Some(changed)
    }

    pub fn as_array(&self) -> &[u16; NUM_CHANNELS] {
        &self.values
    }
}

/// 采样表：`NUM_SAMPLES` 个亮度快照，硬件每个 tick 播放一个
///
/// 超出 `samples_used` 的槽位填零。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTable {
    samples: Vec<[u16; NUM_CHANNELS]>,
}

impl SampleTable {
    /// 用当前亮度表填充前 `samples_used` 个采样
    pub fn from_intensities(intensities: &IntensityTable, samples_used: usize) -> Self {
        let used = samples_used.min(NUM_SAMPLES);
        let mut samples = vec![[0u16; NUM_CHANNELS]; NUM_SAMPLES];
        for sample in samples.iter_mut().take(used) {
            *sample = *intensities.as_array();
        }
        Self { samples }
    }

    pub fn sample(&self, index: usize) -> Option<&[u16; NUM_CHANNELS]> {
        self.samples.get(index)
    }

    /// 非零采样的个数（用于诊断）
    pub fn active_samples(&self) -> usize {
        self.samples
            .iter()
            .filter(|sample| sample.iter().any(|value| *value != 0))
            .count()
    }
}

impl WireBody for SampleTable {
    const LEN: usize = NUM_SAMPLES * NUM_CHANNELS * 2;

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(Self::LEN);
        for sample in &self.samples {
            for value in sample {
                buf.put_u16(*value);
            }
        }
    }

    fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        check_len::<Self>(body)?;
        let mut body = body;
        let mut samples = vec![[0u16; NUM_CHANNELS]; NUM_SAMPLES];
        for sample in samples.iter_mut() {
            for value in sample.iter_mut() {
                *value = body.get_u16();
            }
        }
        Ok(Self { samples })
    }
}

/// 接收方向的消息（按标签分派的和类型）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    SetIntensity(ChannelIntensity),
    LoadFile(Flag),
    SetPeriod(Period),
    FilePlayback(Flag),
    IsFilePlaying(Flag),
    ThermistorValues(ThermistorValues),
}

impl Response {
    /// 按操作码解码消息体
    pub fn decode(opcode: Opcode, body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(match opcode {
            Opcode::SetIntensity => Self::SetIntensity(ChannelIntensity::decode(body)?),
            Opcode::LoadFile => Self::LoadFile(Flag::decode(body)?),
            Opcode::SetPeriod => Self::SetPeriod(Period::decode(body)?),
            Opcode::FilePlayback => Self::FilePlayback(Flag::decode(body)?),
            Opcode::IsFilePlaying => Self::IsFilePlaying(Flag::decode(body)?),
            Opcode::ThermistorValues => Self::ThermistorValues(ThermistorValues::decode(body)?),
        })
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::SetIntensity(_) => Opcode::SetIntensity,
            Self::LoadFile(_) => Opcode::LoadFile,
            Self::SetPeriod(_) => Opcode::SetPeriod,
            Self::FilePlayback(_) => Opcode::FilePlayback,
            Self::IsFilePlaying(_) => Opcode::IsFilePlaying,
            Self::ThermistorValues(_) => Opcode::ThermistorValues,
        }
    }
}

impl Opcode {
    /// 请求消息体长度
    pub const fn request_body_len(self) -> usize {
        match self {
            Opcode::SetIntensity => <<SetIntensity as Command>::Request as WireBody>::LEN,
            Opcode::LoadFile => <<LoadFile as Command>::Request as WireBody>::LEN,
            Opcode::SetPeriod => <<SetPeriod as Command>::Request as WireBody>::LEN,
            Opcode::FilePlayback => <<FilePlayback as Command>::Request as WireBody>::LEN,
            Opcode::IsFilePlaying => <<IsFilePlaying as Command>::Request as WireBody>::LEN,
            Opcode::ThermistorValues => <<ReadThermistors as Command>::Request as WireBody>::LEN,
        }
    }

    /// 响应消息体长度
    pub const fn response_body_len(self) -> usize {
        match self {
            Opcode::SetIntensity => <<SetIntensity as Command>::Response as WireBody>::LEN,
            Opcode::LoadFile => <<LoadFile as Command>::Response as WireBody>::LEN,
            Opcode::SetPeriod => <<SetPeriod as Command>::Response as WireBody>::LEN,
            Opcode::FilePlayback => <<FilePlayback as Command>::Response as WireBody>::LEN,
            Opcode::IsFilePlaying => <<IsFilePlaying as Command>::Response as WireBody>::LEN,
            Opcode::ThermistorValues => <<ReadThermistors as Command>::Response as WireBody>::LEN,
        }
    }
}

/// 命令描述：操作码 + 请求体 + 响应体
pub trait Command {
    const OPCODE: Opcode;
    const TAG: Tag = Tag::for_opcode(Self::OPCODE);

    type Request: WireBody;
    type Response: WireBody;

    /// 从已分派的响应中取出本命令的响应体
    fn from_response(response: Response) -> Option<Self::Response>;
}

/// 设置单通道亮度（回显）
pub struct SetIntensity;

impl Command for SetIntensity {
    const OPCODE: Opcode = Opcode::SetIntensity;
    type Request = ChannelIntensity;
    type Response = ChannelIntensity;

    fn from_response(response: Response) -> Option<Self::Response> {
        match response {
            Response::SetIntensity(body) => Some(body),
            _ => None,
        }
    }
}

/// 下载采样表，响应 fileLoaded
pub struct LoadFile;

impl Command for LoadFile {
    const OPCODE: Opcode = Opcode::LoadFile;
    type Request = SampleTable;
    type Response = Flag;

    fn from_response(response: Response) -> Option<Self::Response> {
        match response {
            Response::LoadFile(body) => Some(body),
            _ => None,
        }
    }
}

/// 设置周期寄存器（回显）
pub struct SetPeriod;

impl Command for SetPeriod {
    const OPCODE: Opcode = Opcode::SetPeriod;
    type Request = Period;
    type Response = Period;

    fn from_response(response: Response) -> Option<Self::Response> {
        match response {
            Response::SetPeriod(body) => Some(body),
            _ => None,
        }
    }
}

/// 开始（`Flag(true)`）或停止（`Flag(false)`）播放，响应播放状态
pub struct FilePlayback;

impl Command for FilePlayback {
    const OPCODE: Opcode = Opcode::FilePlayback;
    type Request = Flag;
    type Response = Flag;

    fn from_response(response: Response) -> Option<Self::Response> {
        match response {
            Response::FilePlayback(body) => Some(body),
            _ => None,
        }
    }
}

/// 查询播放状态
pub struct IsFilePlaying;

impl Command for IsFilePlaying {
    const OPCODE: Opcode = Opcode::IsFilePlaying;
    type Request = Flag;
    type Response = Flag;

    fn from_response(response: Response) -> Option<Self::Response> {
        match response {
            Response::IsFilePlaying(body) => Some(body),
            _ => None,
        }
    }
}

/// 读取热敏电阻（空请求）
pub struct ReadThermistors;

impl Command for ReadThermistors {
    const OPCODE: Opcode = Opcode::ThermistorValues;
    type Request = Empty;
    type Response = ThermistorValues;

    fn from_response(response: Response) -> Option<Self::Response> {
        match response {
            Response::ThermistorValues(body) => Some(body),
            _ => None,
        }
    }
}
