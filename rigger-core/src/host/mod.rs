// 模块声明
mod command;
mod compose;
mod daemon;

// 重新导出公共API
pub use command::{CommandOutput, run_command};
pub use compose::{ComposeManager, ComposeVariant, ensure_network};
pub use daemon::{DaemonState, RunnerDaemon};
