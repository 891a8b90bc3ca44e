use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Runner 守护进程与权限相关命令
#[derive(Subcommand, Debug)]
pub enum RunnerCommand {
    /// 停止 Runner，重建工作目录与各服务 logs 目录，修正 .env 权限后重新启动
    Reset {
        /// 只打印将要执行的步骤
        #[arg(long)]
        dry_run: bool,
        /// 不删除工作目录，只修正权限
        #[arg(long)]
        no_wipe: bool,
    },
    /// 停止 Runner 守护进程
    Stop,
    /// 启动 Runner 守护进程
    Start,
    /// 查看 Runner 守护进程状态
    Status,
}

/// 服务目录管理命令
#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// 初始化服务目录、.env 与 docker-compose.yml
    Add {
        /// 服务名称（小写字母、数字、'-'、'_'）
        name: String,
        /// 端口映射，HOST 或 HOST:CONTAINER
        #[arg(long, short)]
        port: String,
        /// 写入 .env 的初始变量，可重复
        #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
        env: Vec<String>,
        /// 覆盖已存在的 compose 文件
        #[arg(long)]
        force: bool,
        /// 同时在该仓库中生成 CI 工作流
        #[arg(long, value_name = "DIR")]
        workflow_repo: Option<PathBuf>,
        /// 不创建 Docker 网络
        #[arg(long)]
        skip_network: bool,
    },
    /// 列出已初始化的服务
    List,
    /// 确保服务的 logs 目录存在且可写，并打印路径
    LogsDir {
        /// 服务名称
        name: String,
    },
    /// 查看服务容器状态（docker compose ps）
    Ps { name: String },
    /// 停止并移除服务容器（docker compose down）
    Down { name: String },
}

/// 服务 .env 管理命令
#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// 设置一个或多个变量
    Set {
        service: String,
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },
    /// 删除一个或多个变量
    Unset {
        service: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// 输出变量值
    Get { service: String, key: String },
    /// 列出变量（默认隐藏值）
    List {
        service: String,
        /// 显示完整的值
        #[arg(long)]
        reveal: bool,
    },
    /// 修正 .env 权限（不指定服务时处理全部服务）
    FixPerms { service: Option<String> },
}

/// Docker 网络命令
#[derive(Subcommand, Debug)]
pub enum NetworkCommand {
    /// 确保共享网络存在（默认使用配置中的网络名）
    Ensure { name: Option<String> },
}

/// Rigger - 自托管 CI Runner 与 Docker Compose 服务的初始化和权限运维工具
#[derive(Parser, Debug)]
#[command(name = "rigger")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, env = "RIGGER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 生成默认配置文件 rigger.toml
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// Runner 守护进程与工作目录权限
    #[command(subcommand)]
    Runner(RunnerCommand),
    /// 服务目录管理
    #[command(subcommand)]
    Service(ServiceCommand),
    /// 服务 .env 管理
    #[command(subcommand)]
    Env(EnvCommand),
    /// 同步源码到服务目录并启动（保留 .env 与 logs/）
    Deploy {
        /// 服务名称
        service: String,
        /// 源码目录（通常是 Runner 的 checkout 目录）
        #[arg(long, default_value = ".")]
        source: PathBuf,
        /// 只同步文件，不启动服务
        #[arg(long)]
        no_up: bool,
        /// 启动时不重新构建镜像
        #[arg(long)]
        no_build: bool,
    },
    /// Docker 网络管理
    #[command(subcommand)]
    Network(NetworkCommand),
    /// 检查 Runner 工作目录与各服务目录的权限
    Check {
        /// 以 JSON 输出检查结果
        #[arg(long)]
        json: bool,
    },
    /// 在仓库中生成服务的 CI 工作流
    Workflow {
        /// 服务名称
        service: String,
        /// 仓库根目录
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// 端口映射，HOST 或 HOST:CONTAINER
        #[arg(long, short)]
        port: String,
        /// 覆盖已存在的工作流文件
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_service_add() {
        let cli = Cli::try_parse_from([
            "rigger", "-v", "service", "add", "api", "--port", "8080:80", "-e", "A=1", "--env",
            "B=2", "--skip-network",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Service(ServiceCommand::Add {
                name,
                port,
                env,
                force,
                workflow_repo,
                skip_network,
            }) => {
                assert_eq!(name, "api");
                assert_eq!(port, "8080:80");
                assert_eq!(env, vec!["A=1", "B=2"]);
                assert!(!force);
                assert!(workflow_repo.is_none());
                assert!(skip_network);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_runner_reset() {
        let cli = Cli::try_parse_from(["rigger", "runner", "reset", "--dry-run", "--no-wipe"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Runner(RunnerCommand::Reset {
                dry_run: true,
                no_wipe: true
            })
        ));
    }

    #[test]
    fn test_env_set_requires_assignment() {
        assert!(Cli::try_parse_from(["rigger", "env", "set", "api"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["rigger", "check", "--json", "-c", "/etc/rigger.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/rigger.toml")));
        assert!(matches!(cli.command, Commands::Check { json: true }));
    }
}
