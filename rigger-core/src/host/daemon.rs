use super::command::run_command;
use crate::config::RunnerControl;
use crate::constants::runner;
use crate::error::{Result, RiggerError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runner 守护进程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Active,
    Inactive,
}

impl DaemonState {
    pub fn display_name(&self) -> &'static str {
        match self {
            DaemonState::Active => "运行中",
            DaemonState::Inactive => "已停止",
        }
    }
}

/// 自托管 Runner 守护进程控制（systemd 单元或 Runner 自带的 svc.sh）
#[derive(Debug, Clone)]
pub struct RunnerDaemon {
    control: RunnerControl,
    unit: String,
    runner_dir: PathBuf,
}

impl RunnerDaemon {
    pub fn new(control: RunnerControl, unit: impl Into<String>, runner_dir: impl Into<PathBuf>) -> Self {
        Self {
            control,
            unit: unit.into(),
            runner_dir: runner_dir.into(),
        }
    }

    pub fn describe(&self) -> String {
        match self.control {
            RunnerControl::Systemd => format!("systemd 单元 {}", self.unit),
            RunnerControl::SvcScript => format!(
                "{}/{}",
                self.runner_dir.display(),
                runner::SVC_SCRIPT
            ),
        }
    }

    /// 构建 (程序, 参数, 工作目录)
    pub fn command_for(&self, action: &str) -> (String, Vec<String>, Option<&Path>) {
        match self.control {
            RunnerControl::Systemd => {
                let mut args = vec![action.to_string()];
                if action == "is-active" {
                    args.push("--quiet".to_string());
                }
                args.push(self.unit.clone());
                ("systemctl".to_string(), args, None)
            }
            RunnerControl::SvcScript => (
                format!("./{}", runner::SVC_SCRIPT),
                vec![action.to_string()],
                Some(self.runner_dir.as_path()),
            ),
        }
    }

    fn ensure_script(&self) -> Result<()> {
        if self.control == RunnerControl::SvcScript {
            let script = self.runner_dir.join(runner::SVC_SCRIPT);
            if !script.is_file() {
                return Err(RiggerError::daemon(format!(
                    "未找到 Runner 服务脚本: {}",
                    script.display()
                )));
            }
        }
        Ok(())
    }

    /// 停止守护进程；已经停止或未安装时只记录警告
    pub async fn stop(&self) -> Result<()> {
        self.ensure_script()?;
        info!("⏹️  停止 Runner: {}", self.describe());

        let (program, args, cwd) = self.command_for("stop");
        let output = run_command(&program, &args, cwd).await?;
        if output.success {
            info!("✅ Runner 已停止");
            return Ok(());
        }

        if is_already_stopped(&output.combined_lowercase()) {
            warn!("⚠️  Runner 未在运行，跳过停止: {}", output.stderr.trim());
            return Ok(());
        }

        output
            .into_result("停止 Runner")
            .map(|_| ())
            .map_err(|e| RiggerError::daemon(e.to_string()))
    }

    /// 启动守护进程
    pub async fn start(&self) -> Result<()> {
        self.ensure_script()?;
        info!("▶️  启动 Runner: {}", self.describe());

        let (program, args, cwd) = self.command_for("start");
        run_command(&program, &args, cwd)
            .await?
            .into_result("启动 Runner")
            .map_err(|e| RiggerError::daemon(e.to_string()))?;

        info!("✅ Runner 已启动");
        Ok(())
    }

    /// 查询守护进程状态
    pub async fn state(&self) -> Result<DaemonState> {
        self.ensure_script()?;
        let action = match self.control {
            RunnerControl::Systemd => "is-active",
            RunnerControl::SvcScript => "status",
        };
        let (program, args, cwd) = self.command_for(action);
        let output = run_command(&program, &args, cwd).await?;

        let active = match self.control {
            RunnerControl::Systemd => output.success,
            RunnerControl::SvcScript => {
                output.success && output.combined_lowercase().contains("active (running)")
            }
        };

        Ok(if active {
            DaemonState::Active
        } else {
            DaemonState::Inactive
        })
    }
}

/// 判断停止失败是否只是因为服务本来就没有运行
pub fn is_already_stopped(output: &str) -> bool {
    const PATTERNS: [&str; 5] = [
        "not loaded",
        "not running",
        "not installed",
        "not-found",
        "inactive",
    ];
    PATTERNS.iter().any(|p| output.contains(p))
}
