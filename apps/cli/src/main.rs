//! # Blinky CLI
//!
//! Command-line interface for the Blinky LED illumination controller.
//!
//! ```bash
//! # 通道 1-8 亮度 0.5，播放 2 秒
//! blinky-cli run --duration 2s --channels 1-8 --intensity 0.5
//!
//! # 使用配置文件 / 指定串口 / 模拟模式
//! blinky-cli --config blinky.toml read-temps
//! blinky-cli --port /dev/ttyUSB0 stop
//! blinky-cli --simulate monitor
//! ```
//!
//! 日志级别通过 `RUST_LOG` 控制（默认 info）。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;
mod validation;

use commands::{ConfigCommand, IntensityCommand, PrepareCommand, RunCommand};
use utils::{ConnectionArgs, Session, install_interrupt_flag};

/// Blinky CLI - LED 照明控制器命令行工具
#[derive(Parser, Debug)]
#[command(name = "blinky-cli")]
#[command(about = "Command-line interface for the Blinky LED illumination controller", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 下载时间线并播放，等待结束
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 只下载时间线，不播放
    Prepare {
        #[command(flatten)]
        args: PrepareCommand,
    },

    /// 停止播放
    Stop,

    /// 立即设置通道亮度
    SetIntensity {
        #[command(flatten)]
        args: IntensityCommand,
    },

    /// 读取一次热敏电阻温度
    ReadTemps,

    /// 监控播放状态和温度
    Monitor {
        /// 更新频率（Hz）
        #[arg(short, long, default_value_t = 2)]
        frequency: u32,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Config(cmd) = &cli.command {
        return cmd.execute(&cli.connection);
    }

    let interrupted = install_interrupt_flag()?;
    let session = Session::connect(&cli.connection)?;

    match cli.command {
        Commands::Config(_) => Ok(()),
        Commands::Run { args } => args.execute(&session, &interrupted),
        Commands::Prepare { args } => args.execute(&session),
        Commands::Stop => commands::stop::execute(&session),
        Commands::SetIntensity { args } => args.execute(&session),
        Commands::ReadTemps => commands::temps::execute(&session),
        Commands::Monitor { frequency } => commands::monitor::execute(&session, frequency, &interrupted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::try_parse_from([
            "blinky-cli",
            "--simulate",
            "run",
            "--duration",
            "250ms",
            "--channels",
            "1-4",
            "--intensity",
            "0.5",
        ])
        .unwrap();

        assert!(cli.connection.simulate);
        match cli.command {
            Commands::Run { args } => {
                assert_eq!(args.duration, 250_000);
                assert_eq!(args.channels.as_deref(), Some("1-4"));
                assert_eq!(args.intensity, 0.5);
            },
            other => panic!("Expected Run, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["blinky-cli", "read-temps", "--port", "/dev/ttyUSB0"]).unwrap();
        assert_eq!(cli.connection.port.as_deref(), Some("/dev/ttyUSB0"));
        assert!(matches!(cli.command, Commands::ReadTemps));
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(Cli::try_parse_from(["blinky-cli", "run", "--duration", "150us"]).is_err());
        assert!(Cli::try_parse_from(["blinky-cli", "set-intensity", "1", "2.0"]).is_err());
    }
}
