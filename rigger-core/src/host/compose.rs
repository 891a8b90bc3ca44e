use super::command::{CommandOutput, run_command};
use crate::error::{Result, RiggerError};
use std::path::PathBuf;
use tracing::{info, warn};

/// docker compose 的调用方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeVariant {
    /// docker compose（新语法）
    Plugin,
    /// docker-compose（旧语法）
    Standalone,
}

/// 单个服务目录下的 Docker Compose 管理器
#[derive(Debug, Clone)]
pub struct ComposeManager {
    project_dir: PathBuf,
    compose_file: String,
    variant: ComposeVariant,
}

impl ComposeManager {
    pub fn new(project_dir: impl Into<PathBuf>, compose_file: impl Into<String>) -> Self {
        Self {
            project_dir: project_dir.into(),
            compose_file: compose_file.into(),
            variant: ComposeVariant::Plugin,
        }
    }

    pub fn with_variant(mut self, variant: ComposeVariant) -> Self {
        self.variant = variant;
        self
    }

    /// 检测 Docker 与 Compose 是否可用，并选定调用方式
    pub async fn detect() -> Result<ComposeVariant> {
        if which::which("docker").is_err() {
            return Err(RiggerError::command("Docker 未安装或不在 PATH 中"));
        }

        let plugin = run_command("docker", &["compose".to_string(), "version".to_string()], None).await;
        if matches!(plugin, Ok(ref output) if output.success) {
            return Ok(ComposeVariant::Plugin);
        }

        if which::which("docker-compose").is_ok() {
            info!("使用独立的 docker-compose 命令");
            return Ok(ComposeVariant::Standalone);
        }

        Err(RiggerError::command("Docker Compose 未安装或不可用"))
    }

    /// 构建 compose 调用的 (程序, 参数)
    pub fn compose_command(&self, args: &[&str]) -> (String, Vec<String>) {
        let mut full = Vec::new();
        let program = match self.variant {
            ComposeVariant::Plugin => {
                full.push("compose".to_string());
                "docker"
            }
            ComposeVariant::Standalone => "docker-compose",
        };
        full.push("-f".to_string());
        full.push(self.compose_file.clone());
        full.extend(args.iter().map(|a| a.to_string()));
        (program.to_string(), full)
    }

    async fn run_compose(&self, args: &[&str]) -> Result<CommandOutput> {
        if !self.project_dir.join(&self.compose_file).is_file() {
            return Err(RiggerError::command(format!(
                "Docker Compose 文件不存在: {}",
                self.project_dir.join(&self.compose_file).display()
            )));
        }
        let (program, full) = self.compose_command(args);
        run_command(&program, &full, Some(&self.project_dir)).await
    }

    /// 后台启动服务（docker compose up -d）
    pub async fn up(&self, build: bool) -> Result<()> {
        info!("🚀 启动服务: {}", self.project_dir.display());
        let mut args = vec!["up", "-d", "--remove-orphans"];
        if build {
            args.push("--build");
        }
        self.run_compose(&args).await?.into_result("docker compose up")?;
        info!("✅ 服务已启动");
        Ok(())
    }

    pub async fn down(&self) -> Result<()> {
        info!("⏹️  停止服务: {}", self.project_dir.display());
        self.run_compose(&["down"]).await?.into_result("docker compose down")?;
        Ok(())
    }

    /// docker compose ps 的原始输出
    pub async fn ps(&self) -> Result<String> {
        let output = self.run_compose(&["ps"]).await?.into_result("docker compose ps")?;
        Ok(output.stdout)
    }
}

/// 确保外部网络存在，已存在不视为错误
pub async fn ensure_network(name: &str) -> Result<bool> {
    let inspect = run_command("docker", &network_args("inspect", name), None).await?;
    if inspect.success {
        info!("🌐 网络已存在: {}", name);
        return Ok(false);
    }

    let create = run_command("docker", &network_args("create", name), None).await?;
    if create.success {
        info!("✅ 已创建网络: {}", name);
        return Ok(true);
    }

    if create.combined_lowercase().contains("already exists") {
        warn!("🌐 网络已存在: {}", name);
        return Ok(false);
    }

    create.into_result("docker network create").map(|_| false)
}

pub fn network_args(action: &str, name: &str) -> Vec<String> {
    vec!["network".to_string(), action.to_string(), name.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plugin_command() {
        let manager = ComposeManager::new("/opt/apps/api", "docker-compose.yml");
        let (program, args) = manager.compose_command(&["up", "-d"]);
        assert_eq!(program, "docker");
        assert_eq!(args, vec!["compose", "-f", "docker-compose.yml", "up", "-d"]);
    }

    #[test]
    fn test_standalone_command() {
        let manager = ComposeManager::new("/opt/apps/api", "compose.yaml")
            .with_variant(ComposeVariant::Standalone);
        let (program, args) = manager.compose_command(&["ps"]);
        assert_eq!(program, "docker-compose");
        assert_eq!(args, vec!["-f", "compose.yaml", "ps"]);
    }

    #[test]
    fn test_network_args() {
        assert_eq!(
            network_args("create", "app-network"),
            vec!["network", "create", "app-network"]
        );
    }

    #[tokio::test]
    async fn test_up_without_compose_file_fails() {
        let dir = tempdir().unwrap();
        let manager = ComposeManager::new(dir.path(), "docker-compose.yml");
        let err = manager.up(true).await.unwrap_err();
        assert!(err.to_string().contains("Docker Compose 文件不存在"));
    }
}
