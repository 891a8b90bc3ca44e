use crate::app::CliApp;
use anyhow::Result;
use rigger_core::host::{ComposeManager, ensure_network};

/// 确保共享网络存在
pub async fn run_network_ensure(app: &CliApp, name: Option<&str>) -> Result<()> {
    ComposeManager::detect().await?;
    let name = name.unwrap_or(app.provisioner.network());
    ensure_network(name).await?;
    Ok(())
}
