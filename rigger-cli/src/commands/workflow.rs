use crate::app::CliApp;
use anyhow::Result;
use rigger_core::service::{PortMapping, ServiceName, ServiceSpec};
use std::path::Path;
use tracing::info;

/// 在仓库中生成服务的 CI 工作流
pub fn run_workflow(app: &CliApp, service: &str, repo: &Path, port: &str, force: bool) -> Result<()> {
    let spec = ServiceSpec::new(ServiceName::parse(service)?, PortMapping::parse(port)?);
    let (path, written) = app.provisioner.write_workflow(
        &spec,
        repo,
        &app.config.ci,
        &app.config.sync_excludes(),
        force,
    )?;
    if written {
        info!("   💡 提交 {} 后推送到 {} 分支即可触发部署", path.display(), app.config.ci.branch);
    }
    Ok(())
}
