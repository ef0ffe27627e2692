//! Mock LED 驱动器
//!
//! 在 `MockTransport` 的应答函数里模拟设备固件：解析请求帧，更新内部状态，
//! 生成响应帧。可以配置拒绝下载、插入主动推送遥测、返回损坏或错误的响应。

use blinky_protocol::{
    ChannelIntensity, Flag, Opcode, Period, RawFrame, SampleTable, Tag, ThermistorValues,
    WireBody, encode,
};
use blinky_serial::{MockHandle, MockTransport};
use std::sync::{Arc, Mutex};

/// 模拟设备状态
#[derive(Debug, Default)]
pub struct DeviceState {
    pub period: Option<u16>,
    pub table: Option<SampleTable>,
    pub playing: bool,
    pub thermistors: [u16; 4],
    pub intensity_writes: Vec<ChannelIntensity>,
    /// 按顺序记录收到的合法请求
    pub requests: Vec<Opcode>,
    /// 校验失败或无法识别的请求数
    pub bad_requests: usize,

    /// 下载采样表时返回 fileLoaded = false
    pub reject_load: bool,
    /// 开始播放时返回 false
    pub refuse_start: bool,
    /// 每个响应之前插入的主动推送遥测帧数
    pub telemetry_before_reply: usize,
    /// 下一个响应的校验和加 1
    pub corrupt_next_reply: bool,
    /// 下一个响应换成无关标签的帧
    pub wrong_tag_next_reply: bool,
    /// 不响应
    pub silent: bool,
}

/// 可克隆的设备句柄
#[derive(Clone, Default)]
pub struct MockLedBox {
    state: Arc<Mutex<DeviceState>>,
}

impl MockLedBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建连接到本设备的传输
    pub fn connect(&self) -> (MockTransport, MockHandle) {
        let (transport, handle) = MockTransport::new();
        let state = self.state.clone();
        handle.set_responder(move |request| respond(&mut state.lock().unwrap(), request));
        (transport, handle)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn requests(&self) -> Vec<Opcode> {
        self.with(|s| s.requests.clone())
    }

    pub fn count(&self, opcode: Opcode) -> usize {
        self.with(|s| s.requests.iter().filter(|op| **op == opcode).count())
    }

    pub fn clear_requests(&self) {
        self.with(|s| s.requests.clear());
    }

    /// 模拟播放自然结束
    pub fn finish_playback(&self) {
        self.with(|s| s.playing = false);
    }

    pub fn is_playing(&self) -> bool {
        self.with(|s| s.playing)
    }
}

pub fn telemetry_frame(raw: [u16; 4]) -> Vec<u8> {
    encode(Tag::from(Opcode::ThermistorValues), &ThermistorValues { raw }).to_vec()
}

fn respond(state: &mut DeviceState, request: &[u8]) -> Vec<u8> {
    let Some(opcode) = Tag::from_slice(request).ok().and_then(|tag| tag.opcode().ok()) else {
        state.bad_requests += 1;
        return Vec::new();
    };
    let frame = match RawFrame::parse(request, opcode.request_body_len()).and_then(RawFrame::verify)
    {
        Ok(frame) => frame,
        Err(_) => {
            state.bad_requests += 1;
            return Vec::new();
        },
    };
    state.requests.push(opcode);

    if state.silent {
        return Vec::new();
    }

    let tag = Tag::from(opcode);
    let mut reply = match opcode {
        Opcode::SetIntensity => {
            let Ok(body) = ChannelIntensity::decode(&frame.body) else {
                return Vec::new();
            };
            state.intensity_writes.push(body);
            encode(tag, &body).to_vec()
        },
        Opcode::LoadFile => {
            let Ok(table) = SampleTable::decode(&frame.body) else {
                return Vec::new();
            };
            if state.reject_load {
                encode(tag, &Flag(false)).to_vec()
            } else {
                state.table = Some(table);
                encode(tag, &Flag(true)).to_vec()
            }
        },
        Opcode::SetPeriod => {
            let Ok(body) = Period::decode(&frame.body) else {
                return Vec::new();
            };
            state.period = Some(body.ticks);
            encode(tag, &body).to_vec()
        },
        Opcode::FilePlayback => {
            let Ok(Flag(start)) = Flag::decode(&frame.body) else {
                return Vec::new();
            };
            state.playing = start && !state.refuse_start && state.table.is_some();
            encode(tag, &Flag(state.playing)).to_vec()
        },
        Opcode::IsFilePlaying => encode(tag, &Flag(state.playing)).to_vec(),
        Opcode::ThermistorValues => encode(
            tag,
            &ThermistorValues {
                raw: state.thermistors,
            },
        )
        .to_vec(),
    };

    if std::mem::take(&mut state.corrupt_next_reply) {
        if let Some(last) = reply.last_mut() {
            *last = last.wrapping_add(1);
        }
    }
    if std::mem::take(&mut state.wrong_tag_next_reply) {
        reply = encode(Tag([0x05, 0x05, 0x42]), &Flag(true)).to_vec();
    }

    let mut out = Vec::new();
    for _ in 0..state.telemetry_before_reply {
        out.extend(telemetry_frame(state.thermistors));
    }
    out.extend(reply);
    out
}
