//! 连接与输出工具

use anyhow::{Context, Result};
use blinky_driver::{
    DeviceConfig, HostVariable, LedDriver, LedDriverBuilder, MemoryVariable, Temperatures,
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 连接参数（所有子命令共用）
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// 配置文件（TOML）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 串口路径（覆盖配置）
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// 模拟模式（不打开串口）
    #[arg(long, global = true)]
    pub simulate: bool,
}

impl ConnectionArgs {
    /// 加载配置文件并应用命令行覆盖
    pub fn resolve_config(&self) -> Result<DeviceConfig> {
        let mut config = match &self.config {
            Some(path) => DeviceConfig::load(path)
                .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
            None => DeviceConfig::default(),
        };

        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if self.simulate {
            config.simulate = true;
        }
        config.validate()?;
        Ok(config)
    }
}

/// 一次 CLI 会话：驱动实例和它发布到的变量
pub struct Session {
    pub driver: LedDriver,
    pub running: Arc<MemoryVariable>,
}

impl Session {
    pub fn connect(args: &ConnectionArgs) -> Result<Self> {
        let config = args.resolve_config()?;
        let running = MemoryVariable::new("running");
        let running_var: Arc<dyn HostVariable> = running.clone();

        if config.simulate {
            println!("🧪 模拟模式（不连接设备）");
        } else {
            match &config.port {
                Some(port) => println!("🔌 连接到 {}...", port),
                None => println!("🔌 查找设备 \"{}\"...", config.description),
            }
        }

        let driver = LedDriverBuilder::new()
            .config(config)
            .running_variable(running_var)
            .build()
            .context("连接 LED 驱动器失败")?;

        Ok(Self { driver, running })
    }

    /// `running` 变量最近一次发布的值
    pub fn is_running(&self) -> bool {
        self.running.get().and_then(|v| v.as_bool()).unwrap_or(false)
    }
}

/// 安装 Ctrl-C 处理器，返回中断标志
pub fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        eprintln!("\n收到退出信号，正在关闭...");
    })
    .context("安装信号处理器失败")?;
    Ok(interrupted)
}

/// 等待直到 `done` 返回 true 或被中断；返回 false 表示被中断
pub fn wait_until(interrupted: &AtomicBool, interval: Duration, mut done: impl FnMut() -> bool) -> bool {
    loop {
        if done() {
            return true;
        }
        if interrupted.load(Ordering::SeqCst) {
            return false;
        }
        std::thread::sleep(interval);
    }
}

pub fn format_temperatures(temperatures: &Temperatures) -> String {
    let [a, b, c, d] = temperatures.celsius;
    format!("A {:6.2}  B {:6.2}  C {:6.2}  D {:6.2}", a, b, c, d)
}
