use anyhow::Result;
use rigger_core::{
    config::AppConfig,
    host::RunnerDaemon,
    permissions::PermissionManager,
    provision::ServiceProvisioner,
    service::{ServiceLayout, ServiceName},
};
use std::path::Path;
use tracing::debug;

use crate::cli::{Commands, EnvCommand, NetworkCommand, RunnerCommand, ServiceCommand};
use crate::commands;

#[derive(Debug, Clone)]
pub struct CliApp {
    pub config: AppConfig,
    pub provisioner: ServiceProvisioner,
    pub runner_permissions: PermissionManager,
    pub deploy_permissions: PermissionManager,
}

impl CliApp {
    /// 加载配置：指定路径时只读该文件，否则按默认顺序查找
    pub fn load(config_path: Option<&Path>) -> rigger_core::Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load_from_file(path)?,
            None => AppConfig::find_and_load_config()?,
        };
        Self::from_config(config)
    }

    pub fn from_config(config: AppConfig) -> rigger_core::Result<Self> {
        let runner_permissions = PermissionManager::new(config.runner_owner()?);
        let deploy_permissions = PermissionManager::new(config.deploy_owner()?);

        let layout = ServiceLayout::new(config.deploy_root(), config.deploy.compose_file.clone());
        let provisioner = ServiceProvisioner::new(
            layout,
            deploy_permissions.clone(),
            config.dir_mode()?,
            config.env_mode()?,
            config.deploy.network.clone(),
        );
        debug!("部署根目录: {}", config.deploy_root().display());

        Ok(Self {
            config,
            provisioner,
            runner_permissions,
            deploy_permissions,
        })
    }

    pub fn daemon(&self) -> RunnerDaemon {
        RunnerDaemon::new(
            self.config.runner.control,
            self.config.runner.unit.clone(),
            self.config.runner_dir(),
        )
    }

    /// 解析并要求服务已经初始化
    pub fn existing_service(&self, name: &str) -> Result<ServiceName> {
        let name = ServiceName::parse(name)?;
        self.provisioner.require(&name)?;
        Ok(name)
    }

    /// 运行应用命令
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { .. } => unreachable!(), // 已经在 main.rs 中处理
            Commands::Runner(cmd) => self.run_runner_command(cmd).await,
            Commands::Service(cmd) => self.run_service_command(cmd).await,
            Commands::Env(cmd) => self.run_env_command(cmd),
            Commands::Deploy {
                service,
                source,
                no_up,
                no_build,
            } => commands::run_deploy(self, &service, &source, !no_up, !no_build).await,
            Commands::Network(NetworkCommand::Ensure { name }) => {
                commands::run_network_ensure(self, name.as_deref()).await
            }
            Commands::Check { json } => commands::run_check(self, json),
            Commands::Workflow {
                service,
                repo,
                port,
                force,
            } => commands::run_workflow(self, &service, &repo, &port, force),
        }
    }

    async fn run_runner_command(&self, cmd: RunnerCommand) -> Result<()> {
        match cmd {
            RunnerCommand::Reset { dry_run, no_wipe } => {
                commands::run_runner_reset(self, dry_run, no_wipe).await
            }
            RunnerCommand::Stop => Ok(self.daemon().stop().await?),
            RunnerCommand::Start => Ok(self.daemon().start().await?),
            RunnerCommand::Status => commands::run_runner_status(self).await,
        }
    }

    async fn run_service_command(&self, cmd: ServiceCommand) -> Result<()> {
        match cmd {
            ServiceCommand::Add {
                name,
                port,
                env,
                force,
                workflow_repo,
                skip_network,
            } => {
                let options = commands::AddOptions {
                    env,
                    force,
                    workflow_repo,
                    skip_network,
                };
                commands::run_service_add(self, &name, &port, options).await
            }
            ServiceCommand::List => commands::run_service_list(self),
            ServiceCommand::LogsDir { name } => commands::run_logs_dir(self, &name),
            ServiceCommand::Ps { name } => commands::run_service_ps(self, &name).await,
            ServiceCommand::Down { name } => commands::run_service_down(self, &name).await,
        }
    }

    fn run_env_command(&self, cmd: EnvCommand) -> Result<()> {
        match cmd {
            EnvCommand::Set {
                service,
                assignments,
            } => commands::run_env_set(self, &service, &assignments),
            EnvCommand::Unset { service, keys } => commands::run_env_unset(self, &service, &keys),
            EnvCommand::Get { service, key } => commands::run_env_get(self, &service, &key),
            EnvCommand::List { service, reveal } => commands::run_env_list(self, &service, reveal),
            EnvCommand::FixPerms { service } => commands::run_env_fix_perms(self, service.as_deref()),
        }
    }
}
