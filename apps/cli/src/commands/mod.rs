//! 命令定义和实现

pub mod config;
pub mod intensity;
pub mod monitor;
pub mod prepare;
pub mod run;
pub mod stop;
pub mod temps;

pub use config::ConfigCommand;
pub use intensity::IntensityCommand;
pub use prepare::PrepareCommand;
pub use run::RunCommand;
