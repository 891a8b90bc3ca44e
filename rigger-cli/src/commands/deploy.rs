use crate::app::CliApp;
use anyhow::{Context, Result};
use rigger_core::constants::deploy;
use rigger_core::host::{ComposeManager, ensure_network};
use rigger_core::sync::{DirectorySync, sync_preserving};
use std::path::Path;
use tracing::info;

/// 同步源码到服务目录，保留 .env 与 logs/，然后启动服务
pub async fn run_deploy(
    app: &CliApp,
    service: &str,
    source: &Path,
    up: bool,
    build: bool,
) -> Result<()> {
    let name = app.existing_service(service)?;
    let layout = app.provisioner.layout();
    let target = layout.dir(&name);
    let source = source
        .canonicalize()
        .with_context(|| format!("源码目录不存在: {}", source.display()))?;

    info!("📦 同步 {} → {}", source.display(), target.display());
    let syncer = DirectorySync::new(&app.config.sync_excludes())?;
    let report = sync_preserving(
        &syncer,
        &source,
        &target,
        deploy::ENV_FILE_NAME,
        app.provisioner.env_mode(),
    )?;
    info!(
        "   复制 {} / 未变 {} / 删除 {}",
        report.copied, report.unchanged, report.deleted
    );

    app.provisioner.ensure_logs(&name)?;

    if !up {
        info!("⏭️  已跳过启动（--no-up）");
        return Ok(());
    }

    let variant = ComposeManager::detect().await?;
    ensure_network(app.provisioner.network()).await?;
    ComposeManager::new(&target, layout.compose_file_name())
        .with_variant(variant)
        .up(build)
        .await?;

    info!("🎉 {} 部署完成", name);
    Ok(())
}
