//! Driver 模式定义

/// Driver 工作模式
///
/// - **Hardware**: 所有命令经串口发送给设备
/// - **Simulated**: 不打开串口，跳过全部 I/O；播放按时钟模拟，
///   到达播放时长后自动回到 Idle，不发布温度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverMode {
    /// 硬件模式（默认）
    #[default]
    Hardware,

    /// 模拟模式
    Simulated,
}

impl DriverMode {
    pub fn from_simulate_flag(simulate: bool) -> Self {
        if simulate { Self::Simulated } else { Self::Hardware }
    }

    /// 是否为模拟模式
    pub fn is_simulated(self) -> bool {
        self == Self::Simulated
    }
}

impl std::fmt::Display for DriverMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hardware => f.pad("hardware"),
            Self::Simulated => f.pad("simulated"),
        }
    }
}
