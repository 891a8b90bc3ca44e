use clap::Parser;
use rigger_cli::{Cli, CliApp, Commands, project_info, run_init, setup_logging};
use rigger_core::RiggerError;
use tracing::{debug, error};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 写文件时 guard 必须活到进程结束
    let _log_guard = setup_logging(cli.verbose);
    debug!("{}", project_info::banner());

    // `init` 命令不需要预先加载配置
    if let Commands::Init { force } = cli.command {
        if let Err(e) = run_init(force, cli.config.as_deref()) {
            error!("❌ 初始化失败: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let app = match CliApp::load(cli.config.as_deref()) {
        Ok(app) => app,
        Err(RiggerError::ConfigNotFound) => {
            match &cli.config {
                Some(path) => error!("❌ 配置文件 '{}' 未找到。", path.display()),
                None => error!("❌ 未找到配置文件 rigger.toml。"),
            }
            error!("👉 请先运行 'rigger init' 命令来创建配置文件。");
            std::process::exit(1);
        }
        Err(e) => {
            error!("❌ 加载配置失败: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run_command(cli.command).await {
        error!("❌ 操作失败: {:#}", e);
        std::process::exit(1);
    }
}
