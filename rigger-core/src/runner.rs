use crate::error::Result;
use crate::host::RunnerDaemon;
use crate::permissions::PermissionManager;
use crate::provision::ServiceProvisioner;
use crate::service::ServiceName;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// Runner 权限重置的结果
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ResetReport {
    pub work_dir: PathBuf,
    pub wiped: bool,
    pub logs_dirs: Vec<PathBuf>,
    pub env_files_fixed: usize,
    pub dry_run: bool,
}

/// 自托管 Runner 权限重置
///
/// 步骤严格按顺序执行：停止守护进程 → 重建工作目录 → 重建各服务 logs 目录
/// → 修正 .env 权限 → 启动守护进程。任一步失败即中止。
pub struct RunnerReset {
    daemon: RunnerDaemon,
    permissions: PermissionManager,
    provisioner: ServiceProvisioner,
    work_dir: PathBuf,
    dir_mode: u32,
    wipe: bool,
}

impl RunnerReset {
    pub fn new(
        daemon: RunnerDaemon,
        permissions: PermissionManager,
        provisioner: ServiceProvisioner,
        work_dir: PathBuf,
        dir_mode: u32,
        wipe: bool,
    ) -> Self {
        Self {
            daemon,
            permissions,
            provisioner,
            work_dir,
            dir_mode,
            wipe,
        }
    }

    /// 输出执行计划，不做任何修改
    pub fn plan(&self, services: &[ServiceName]) -> Vec<String> {
        let layout = self.provisioner.layout();
        let owner = self
            .permissions
            .owner()
            .map_or_else(|| "不变".to_string(), |o| o.to_string());

        let mut steps = vec![format!("停止 {}", self.daemon.describe())];
        if self.wipe {
            steps.push(format!("删除 {}", self.work_dir.display()));
        }
        steps.push(format!(
            "重建 {} (mode {:o}, owner {})",
            self.work_dir.display(),
            self.dir_mode,
            owner
        ));
        for name in services {
            steps.push(format!(
                "确保 {} (mode {:o})",
                layout.logs_dir(name).display(),
                self.dir_mode
            ));
            steps.push(format!(
                "修正 {} (mode {:o})",
                layout.env_file(name).display(),
                self.provisioner.env_mode()
            ));
        }
        steps.push(format!("启动 {}", self.daemon.describe()));
        steps
    }

    fn apply_directories(&self, services: &[ServiceName], report: &mut ResetReport) -> Result<()> {
        info!("📁 重建 Runner 工作目录: {}", self.work_dir.display());
        self.permissions
            .recreate_dir(&self.work_dir, self.dir_mode, self.wipe)?;
        report.wiped = self.wipe;

        for name in services {
            report.logs_dirs.push(self.provisioner.ensure_logs(name)?);
            if self.provisioner.fix_env_permissions(name)? {
                report.env_files_fixed += 1;
            }
        }
        Ok(())
    }

    /// 执行重置
    pub async fn reset(&self, services: &[ServiceName], dry_run: bool) -> Result<ResetReport> {
        let mut report = ResetReport {
            work_dir: self.work_dir.clone(),
            dry_run,
            ..Default::default()
        };

        if dry_run {
            info!("🔍 演练模式，以下步骤不会执行:");
            for (i, step) in self.plan(services).iter().enumerate() {
                info!("   {}. {}", i + 1, step);
            }
            return Ok(report);
        }

        self.daemon.stop().await?;

        if let Err(e) = self.apply_directories(services, &mut report) {
            error!("❌ 目录重建失败，Runner 仍处于停止状态");
            error!("👉 修复问题后运行 'rigger runner reset' 或 'rigger runner start'");
            return Err(e);
        }

        self.daemon.start().await?;

        info!(
            "🎉 Runner 重置完成: {} 个 logs 目录, {} 个 .env 已修正",
            report.logs_dirs.len(),
            report.env_files_fixed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerControl;
    use crate::service::ServiceLayout;
    use std::fs;
    use tempfile::tempdir;

    fn reset_for(root: &std::path::Path, wipe: bool) -> RunnerReset {
        let provisioner = ServiceProvisioner::new(
            ServiceLayout::new(root.join("apps"), "docker-compose.yml"),
            PermissionManager::new(None),
            0o777,
            0o600,
            "app-network",
        );
        RunnerReset::new(
            RunnerDaemon::new(RunnerControl::SvcScript, "unused", root.join("runner")),
            PermissionManager::new(None),
            provisioner,
            root.join("runner/_work"),
            0o777,
            wipe,
        )
    }

    #[test]
    fn test_plan_order() {
        let dir = tempdir().unwrap();
        let reset = reset_for(dir.path(), true);
        let services = vec![ServiceName::parse("api").unwrap()];

        let plan = reset.plan(&services);
        assert!(plan.first().unwrap().starts_with("停止"));
        assert!(plan[1].starts_with("删除"));
        assert!(plan[2].starts_with("重建"));
        assert!(plan[3].contains("api/logs"));
        assert!(plan[4].contains("api/.env"));
        assert!(plan.last().unwrap().starts_with("启动"));
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let reset = reset_for(dir.path(), true);
        let work = dir.path().join("runner/_work");
        fs::create_dir_all(work.join("repo")).unwrap();

        let services = vec![ServiceName::parse("api").unwrap()];
        let report = reset.reset(&services, true).await.unwrap();

        assert!(report.dry_run);
        assert!(work.join("repo").exists());
        assert!(!dir.path().join("apps/api/logs").exists());
    }

    #[tokio::test]
    async fn test_reset_aborts_when_daemon_unavailable() {
        let dir = tempdir().unwrap();
        let reset = reset_for(dir.path(), true);
        let work = dir.path().join("runner/_work");
        fs::create_dir_all(work.join("repo")).unwrap();

        // runner 目录下没有 svc.sh，停止失败后不能动目录
        assert!(reset.reset(&[], false).await.is_err());
        assert!(work.join("repo").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_directories() {
        use crate::permissions::mode_of;

        let dir = tempdir().unwrap();
        let reset = reset_for(dir.path(), true);
        let work = dir.path().join("runner/_work");
        fs::create_dir_all(work.join("stale")).unwrap();
        fs::create_dir_all(dir.path().join("apps/api")).unwrap();
        fs::write(dir.path().join("apps/api/.env"), "A=1\n").unwrap();

        let services = vec![
            ServiceName::parse("api").unwrap(),
            ServiceName::parse("web").unwrap(),
        ];
        let mut report = ResetReport::default();
        reset.apply_directories(&services, &mut report).unwrap();

        assert!(report.wiped);
        assert!(!work.join("stale").exists());
        assert_eq!(mode_of(&work).unwrap(), 0o777);
        assert_eq!(report.logs_dirs.len(), 2);
        assert_eq!(mode_of(&dir.path().join("apps/web/logs")).unwrap(), 0o777);
        assert_eq!(report.env_files_fixed, 1);
        assert_eq!(mode_of(&dir.path().join("apps/api/.env")).unwrap(), 0o600);
    }
}
