//! 请求 / 响应交换
//!
//! 线路上没有长度字段，接收方必须先读 3 字节标签，再按标签决定消息体长度。
//! 设备会在任意时刻主动推送热敏电阻读数，所以等待响应时可能先收到遥测帧：
//!
//! - 标签等于预期响应：读完整帧并校验（校验失败时返回错误，不清空缓冲区）
//! - 标签是热敏电阻读数（但预期的不是）：读完整帧，交给遥测回调，继续等待
//! - 其他标签：清空接收缓冲区，返回 `UnexpectedTag`
//!
//! `Link` 不加锁；调用者（设备层）保证同一时刻只有一个交换在进行。

use crate::error::DriverError;
use blinky_protocol::{
    Command, Opcode, RawFrame, ReadThermistors, Response, Tag, ThermistorValues, WireBody, encode,
    frame_len,
};
use blinky_serial::SerialTransport;
use tracing::{debug, trace, warn};

/// 遥测回调：等待其他响应时收到热敏电阻读数时调用
pub type TelemetrySink = Box<dyn FnMut(ThermistorValues) + Send>;

/// 一个打开的串口连接
pub struct Link<T: SerialTransport> {
    transport: T,
    on_telemetry: TelemetrySink,
}

impl<T: SerialTransport> Link<T> {
    pub fn new(transport: T, on_telemetry: TelemetrySink) -> Self {
        Self {
            transport,
            on_telemetry,
        }
    }

    /// 发送一条命令并等待它的响应
    ///
    /// 等待期间收到的主动推送遥测会交给遥测回调，不会作为结果返回。
    pub fn exchange<C: Command>(&mut self, request: &C::Request) -> Result<C::Response, DriverError> {
        let frame = encode(C::TAG, request);
        trace!("TX {} ({} bytes): {}", C::TAG, frame.len(), hex::encode(&frame));
        self.transport.write_all(&frame)?;

        loop {
            let (opcode, raw) = self.read_frame(C::OPCODE)?;

            if opcode != C::OPCODE {
                // 只可能是热敏电阻读数
                self.accept_telemetry(opcode, raw);
                continue;
            }

            let raw = raw.verify()?;
            let response = Response::decode(opcode, &raw.body)?;
            return C::from_response(response).ok_or(DriverError::UnexpectedTag {
                expected: C::TAG,
                actual: raw.tag,
            });
        }
    }

    /// 回显式交换：请求与响应同形
    ///
    /// 发送 `message`，再把设备的回显写回 `message`。
    pub fn perform<C, B>(&mut self, message: &mut B) -> Result<(), DriverError>
    where
        C: Command<Request = B, Response = B>,
        B: WireBody,
    {
        *message = self.exchange::<C>(message)?;
        Ok(())
    }

    /// 读出接收队列中已经完整到达的主动推送遥测帧
    ///
    /// 不会阻塞等待新数据。返回处理的帧数。
    pub fn drain_pending(&mut self) -> Result<usize, DriverError> {
        let telemetry_len = frame_len(ThermistorValues::LEN);
        let mut drained = 0;

        while self.transport.bytes_available()? >= telemetry_len {
            let (opcode, raw) = self.read_frame(ReadThermistors::OPCODE)?;
            self.accept_telemetry(opcode, raw);
            drained += 1;
        }

        if drained > 0 {
            debug!("Drained {} pending telemetry frame(s)", drained);
        }
        Ok(drained)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// 读一帧：先读标签，再按标签读剩余部分（不校验）
    ///
    /// 返回的操作码只可能是 `expected` 或热敏电阻读数。
    fn read_frame(&mut self, expected: Opcode) -> Result<(Opcode, RawFrame), DriverError> {
        let mut tag = [0u8; Tag::LEN];
        self.transport.read_exact(&mut tag)?;
        let tag = Tag(tag);

        let opcode = match tag.opcode() {
            Ok(op) if op == expected || op == Opcode::ThermistorValues => op,
            _ => {
                warn!(
                    "Unexpected message {} while waiting for {}, purging receive buffer",
                    tag,
                    Tag::from(expected)
                );
                if let Err(e) = self.transport.purge_rx() {
                    warn!("Failed to purge receive buffer: {}", e);
                }
                return Err(DriverError::UnexpectedTag {
                    expected: Tag::from(expected),
                    actual: tag,
                });
            },
        };

        let body_len = opcode.response_body_len();
        let mut bytes = vec![0u8; frame_len(body_len)];
        bytes[..Tag::LEN].copy_from_slice(tag.as_bytes());
        self.transport.read_exact(&mut bytes[Tag::LEN..])?;
        trace!("RX {} ({} bytes): {}", tag, bytes.len(), hex::encode(&bytes));

        Ok((opcode, RawFrame::parse(&bytes, body_len)?))
    }

    /// 处理一帧热敏电阻读数
    ///
    /// 帧长度固定，校验失败时丢弃这一帧即可保持同步。
    fn accept_telemetry(&mut self, opcode: Opcode, raw: RawFrame) {
        let decoded = raw
            .verify()
            .map_err(DriverError::from)
            .and_then(|raw| Response::decode(opcode, &raw.body).map_err(DriverError::from));

        match decoded {
            Ok(Response::ThermistorValues(values)) => {
                debug!("Received unsolicited thermistor values: {:?}", values.raw);
                (self.on_telemetry)(values);
            },
            Ok(other) => warn!("Ignoring unexpected message {:?}", other.opcode()),
            Err(e) => warn!("Discarding corrupt telemetry frame: {}", e),
        }
    }
}
