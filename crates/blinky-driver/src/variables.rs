//! 宿主变量
//!
//! 驱动通过 [`HostVariable`] 向宿主进程发布状态：
//! - `running`：播放中为 `true`，播放结束或停止后为 `false`
//! - 四个可选的温度变量（热敏电阻 A、B、C、D）

use crate::temperature::Temperatures;
use parking_lot::Mutex;
use std::sync::Arc;

/// 变量值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Float(f64),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Bool(_) => None,
        }
    }
}

/// 宿主进程提供的可写变量
pub trait HostVariable: Send + Sync {
    fn set(&self, value: Value);
}

/// 内存变量：记录当前值和全部写入历史
#[derive(Debug, Default)]
pub struct MemoryVariable {
    name: String,
    history: Mutex<Vec<Value>>,
}

impl MemoryVariable {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 最近一次写入的值
    pub fn get(&self) -> Option<Value> {
        self.history.lock().last().copied()
    }

    pub fn history(&self) -> Vec<Value> {
        self.history.lock().clone()
    }
}

impl HostVariable for MemoryVariable {
    fn set(&self, value: Value) {
        self.history.lock().push(value);
    }
}

/// 驱动发布状态用到的全部变量（都可以缺省）
#[derive(Clone, Default)]
pub struct HostBindings {
    pub running: Option<Arc<dyn HostVariable>>,
    pub temperatures: [Option<Arc<dyn HostVariable>>; 4],
}

impl HostBindings {
    pub fn set_running(&self, running: bool) {
        if let Some(var) = &self.running {
            var.set(Value::Bool(running));
        }
    }

    /// 发布 A、B、C、D 四路温度；没有绑定的通道跳过
    pub fn publish_temperatures(&self, temperatures: &Temperatures) {
        for (var, celsius) in self.temperatures.iter().zip(temperatures.celsius) {
            if let Some(var) = var {
                var.set(Value::Float(celsius));
            }
        }
    }
}

impl std::fmt::Debug for HostBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBindings")
            .field("running", &self.running.is_some())
            .field(
                "temperatures",
                &self.temperatures.iter().map(Option::is_some).collect::<Vec<_>>(),
            )
            .finish()
    }
}
