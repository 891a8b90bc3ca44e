use crate::app::CliApp;
use anyhow::{Result, bail};
use rigger_core::check::HealthCheck;
use tracing::info;

/// 检查权限，发现问题时返回错误以便以非零码退出
pub fn run_check(app: &CliApp, json: bool) -> Result<()> {
    let report = HealthCheck::new(
        &app.runner_permissions,
        &app.deploy_permissions,
        &app.provisioner,
        app.config.dir_mode()?,
    )
    .run(&app.config.runner_work_dir())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!(
            "{} Runner 工作目录: {}",
            if report.runner_work_dir.ok { "✅" } else { "❌" },
            report.runner_work_dir.path.display()
        );
        for service in &report.services {
            info!(
                "{} {}",
                if service.is_ok() { "✅" } else { "❌" },
                service.name
            );
        }
    }

    let violations = report.violations().len();
    if violations > 0 {
        bail!("发现 {} 处权限问题，运行 'rigger runner reset' 修复", violations);
    }
    info!("🎉 权限检查通过");
    Ok(())
}
