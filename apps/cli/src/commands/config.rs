//! 配置命令

use crate::utils::ConnectionArgs;
use anyhow::Result;
use clap::Subcommand;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置（TOML）
    Show,

    /// 校验配置文件
    Check,
}

impl ConfigCommand {
    pub fn execute(&self, args: &ConnectionArgs) -> Result<()> {
        let config = args.resolve_config()?;
        match self {
            ConfigCommand::Show => print!("{}", config.to_toml_string()?),
            ConfigCommand::Check => println!("✅ 配置有效"),
        }
        Ok(())
    }
}
