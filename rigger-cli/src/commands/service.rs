use crate::app::CliApp;
use crate::utils::parse_assignments;
use anyhow::Result;
use rigger_core::host::{ComposeManager, ensure_network};
use rigger_core::service::{PortMapping, ServiceName, ServiceSpec};
use std::path::PathBuf;
use tracing::{info, warn};

/// `service add` 的可选参数
#[derive(Debug, Default)]
pub struct AddOptions {
    pub env: Vec<String>,
    pub force: bool,
    pub workflow_repo: Option<PathBuf>,
    pub skip_network: bool,
}

/// 初始化一个新服务
pub async fn run_service_add(
    app: &CliApp,
    name: &str,
    port: &str,
    options: AddOptions,
) -> Result<()> {
    let name = ServiceName::parse(name)?;
    let port = PortMapping::parse(port)?;
    let initial_env = parse_assignments(&options.env)?;

    if !port.is_host_port_available() {
        warn!("⚠️  主机端口 {} 当前已被占用", port.host_port);
    }

    let spec = ServiceSpec::new(name, port);
    let report = app.provisioner.provision(&spec, &initial_env, options.force)?;

    if !options.skip_network {
        // 网络创建失败不影响目录初始化
        let network = app.provisioner.network();
        match ComposeManager::detect().await {
            Ok(_) => {
                if let Err(e) = ensure_network(network).await {
                    warn!("⚠️  创建网络 {} 失败: {}", network, e);
                    info!("   💡 稍后运行 'rigger network ensure' 重试");
                }
            }
            Err(e) => warn!("⚠️  跳过网络创建: {}", e),
        }
    }

    if let Some(repo) = &options.workflow_repo {
        app.provisioner.write_workflow(
            &spec,
            repo,
            &app.config.ci,
            &app.config.sync_excludes(),
            options.force,
        )?;
    }

    info!("🎉 服务 {} 已就绪: {}", report.service, report.dir.display());
    if report.env_created {
        info!("   📝 已创建 .env，使用 'rigger env set {} KEY=VALUE' 写入密钥", report.service);
    }
    Ok(())
}

pub fn run_service_list(app: &CliApp) -> Result<()> {
    let services = app.provisioner.list()?;
    if services.is_empty() {
        info!(
            "📭 {} 下没有已初始化的服务",
            app.provisioner.layout().root().display()
        );
        return Ok(());
    }

    info!("📋 服务列表 ({}):", services.len());
    for name in services {
        println!("{name}\t{}", app.provisioner.layout().dir(&name).display());
    }
    Ok(())
}

/// 确保 logs 目录存在并打印路径，供脚本使用
pub fn run_logs_dir(app: &CliApp, name: &str) -> Result<()> {
    let name = app.existing_service(name)?;
    let logs = app.provisioner.ensure_logs(&name)?;
    println!("{}", logs.display());
    Ok(())
}

async fn compose_for(app: &CliApp, name: &str) -> Result<ComposeManager> {
    let name = app.existing_service(name)?;
    let layout = app.provisioner.layout();
    let variant = ComposeManager::detect().await?;
    Ok(ComposeManager::new(layout.dir(&name), layout.compose_file_name()).with_variant(variant))
}

pub async fn run_service_ps(app: &CliApp, name: &str) -> Result<()> {
    let output = compose_for(app, name).await?.ps().await?;
    print!("{output}");
    Ok(())
}

pub async fn run_service_down(app: &CliApp, name: &str) -> Result<()> {
    compose_for(app, name).await?.down().await?;
    info!("✅ {} 已停止", name);
    Ok(())
}
