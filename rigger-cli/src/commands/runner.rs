use crate::app::CliApp;
use anyhow::Result;
use rigger_core::runner::RunnerReset;
use tracing::info;

/// 重置 Runner 工作目录与服务目录权限
pub async fn run_runner_reset(app: &CliApp, dry_run: bool, no_wipe: bool) -> Result<()> {
    let services = app.provisioner.list()?;
    info!("📋 已登记服务: {}", services.len());

    let reset = RunnerReset::new(
        app.daemon(),
        app.runner_permissions.clone(),
        app.provisioner.clone(),
        app.config.runner_work_dir(),
        app.config.dir_mode()?,
        app.config.runner.wipe_work_dir && !no_wipe,
    );
    let report = reset.reset(&services, dry_run).await?;

    if !report.dry_run {
        info!("   工作目录: {}", report.work_dir.display());
        for logs in &report.logs_dirs {
            info!("   logs: {}", logs.display());
        }
    }
    Ok(())
}

pub async fn run_runner_status(app: &CliApp) -> Result<()> {
    let daemon = app.daemon();
    let state = daemon.state().await?;
    info!("🏃 Runner: {}", daemon.describe());
    info!("   状态: {}", state.display_name());

    let work_dir = app.config.runner_work_dir();
    let check = app
        .runner_permissions
        .inspect(&work_dir, app.config.dir_mode()?);
    if check.ok {
        info!("   ✅ 工作目录: {}", work_dir.display());
    } else {
        info!(
            "   ❌ 工作目录: {} (mode {})",
            work_dir.display(),
            check.mode.as_deref().unwrap_or("不存在")
        );
        info!("   💡 运行 'rigger runner reset' 修复");
    }
    Ok(())
}
