//! Mock 传输
//!
//! 用于测试的内存串口：
//! - 每次 `write` 调用都会被记录，并交给可选的应答函数生成设备响应
//! - `MockHandle::inject` 模拟设备主动推送的字节（如遥测帧）
//! - 读取不会阻塞：数据不足时立即返回已有字节数（等价于超时）

use crate::{SerialError, SerialTransport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// 应答函数：输入一次写入的完整字节，返回追加到接收队列的字节
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

#[derive(Default)]
struct MockState {
    rx: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    purges: usize,
    responder: Option<Responder>,
    fail_writes: usize,
    timeouts: Option<(Duration, Duration)>,
    closed: bool,
}

/// 内存串口（移交给被测代码）
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// 测试侧句柄（可克隆，观察与注入）
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockHandle { state },
        )
    }
}

impl MockHandle {
    /// 设置应答函数
    pub fn set_responder(&self, responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) {
        self.state.lock().responder = Some(Box::new(responder));
    }

    /// 追加设备主动发送的字节
    pub fn inject(&self, bytes: &[u8]) {
        self.state.lock().rx.extend(bytes.iter().copied());
    }

    /// 让接下来 `count` 次写入完全失败（写入 0 字节）
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().fail_writes = count;
    }

    /// 每次 `write` 调用的字节（按顺序）
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    /// 所有写入字节拼接后的线路流
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state.lock().written.concat()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().written.len()
    }

    pub fn clear_written(&self) {
        self.state.lock().written.clear();
    }

    pub fn purge_count(&self) -> usize {
        self.state.lock().purges
    }

    /// 接收队列中剩余的字节数
    pub fn pending_rx(&self) -> usize {
        self.state.lock().rx.len()
    }

    pub fn timeouts(&self) -> Option<(Duration, Duration)> {
        self.state.lock().timeouts
    }

    /// 传输是否已被关闭（`MockTransport` 已 drop）
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl SerialTransport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(SerialError::Closed);
        }
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Ok(0);
        }
        state.written.push(data.to_vec());
        if let Some(responder) = state.responder.as_mut() {
            let reply = responder(data);
            state.rx.extend(reply);
        }
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let mut state = self.state.lock();
        let n = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn bytes_available(&mut self) -> Result<usize, SerialError> {
        Ok(self.state.lock().rx.len())
    }

    fn purge_rx(&mut self) -> Result<(), SerialError> {
        let mut state = self.state.lock();
        state.rx.clear();
        state.purges += 1;
        Ok(())
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<(), SerialError> {
        self.state.lock().timeouts = Some((read, write));
        Ok(())
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.state.lock().closed = true;
    }
}
