// 模块声明
mod compose;
mod workflow;

// 重新导出公共API
pub use compose::{ComposeFile, ComposeService, ExternalNetwork};
pub use workflow::{Workflow, WorkflowJob, WorkflowStep};

use chrono::{DateTime, Local};

/// 生成文件的头部注释
pub(crate) fn generated_header(kind: &str, now: DateTime<Local>) -> String {
    format!(
        "# {kind} 由 rigger v{} 生成于 {}\n# 可以手动修改，rigger 不会覆盖已存在的文件（除非使用 --force）\n",
        crate::constants::version::CORE_VERSION,
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// 单引号转义，用于生成的 shell 脚本
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
