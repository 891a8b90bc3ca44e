use crate::env_file::{self, EnvFile};
use crate::error::{Result, RiggerError};
use crate::permissions::PermissionManager;
use crate::scaffold::{ComposeFile, Workflow};
use crate::config::CiConfig;
use crate::service::{ServiceLayout, ServiceName, ServiceSpec};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 服务初始化结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProvisionReport {
    pub service: ServiceName,
    pub dir: PathBuf,
    pub env_created: bool,
    pub env_keys_set: usize,
    pub compose_written: bool,
}

/// 服务初始化器：创建目录、设置权限、写入 .env 与 compose 文件，所有操作可重复执行
#[derive(Debug, Clone)]
pub struct ServiceProvisioner {
    layout: ServiceLayout,
    permissions: PermissionManager,
    dir_mode: u32,
    env_mode: u32,
    network: String,
}

impl ServiceProvisioner {
    pub fn new(
        layout: ServiceLayout,
        permissions: PermissionManager,
        dir_mode: u32,
        env_mode: u32,
        network: impl Into<String>,
    ) -> Self {
        Self {
            layout,
            permissions,
            dir_mode,
            env_mode,
            network: network.into(),
        }
    }

    pub fn layout(&self) -> &ServiceLayout {
        &self.layout
    }

    pub fn env_mode(&self) -> u32 {
        self.env_mode
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// 初始化服务目录
    pub fn provision(
        &self,
        spec: &ServiceSpec,
        initial_env: &[(String, String)],
        force: bool,
    ) -> Result<ProvisionReport> {
        let name = &spec.name;
        info!("📋 初始化服务: {}", name);

        self.permissions
            .ensure_dir(&self.layout.dir(name), self.dir_mode)?;
        self.ensure_logs(name)?;
        self.permissions
            .ensure_dir(&self.layout.data_dir(name), self.dir_mode)?;

        let env_path = self.layout.env_file(name);
        let env_created = !env_path.exists();
        let mut env = EnvFile::load(&env_path)?;
        for (key, value) in initial_env {
            env.set(key, value)?;
        }
        if env_created || !initial_env.is_empty() {
            env.save(&env_path, self.env_mode)?;
        } else {
            env_file::ensure_mode(&env_path, self.env_mode)?;
            debug!(".env 已存在，仅修正权限: {}", env_path.display());
        }

        let compose_path = self.layout.compose_file(name);
        let compose_written = if compose_path.exists() && !force {
            warn!(
                "⚠️  compose 文件已存在，跳过生成（使用 --force 覆盖）: {}",
                compose_path.display()
            );
            false
        } else {
            let compose = ComposeFile::for_service(spec, &self.network);
            fs::write(&compose_path, compose.render()?)?;
            info!("✅ 已生成 {}", compose_path.display());
            true
        };

        Ok(ProvisionReport {
            service: name.clone(),
            dir: self.layout.dir(name),
            env_created,
            env_keys_set: initial_env.len(),
            compose_written,
        })
    }

    /// 确保服务的 logs 目录存在且权限正确
    pub fn ensure_logs(&self, name: &ServiceName) -> Result<PathBuf> {
        let logs = self.layout.logs_dir(name);
        self.permissions.ensure_dir(&logs, self.dir_mode)?;
        Ok(logs)
    }

    /// 修正服务 .env 的权限，文件不存在时返回 false
    pub fn fix_env_permissions(&self, name: &ServiceName) -> Result<bool> {
        let fixed = env_file::ensure_mode(&self.layout.env_file(name), self.env_mode)?;
        if fixed {
            info!("🔐 {} 的 .env 权限 → {:o}", name, self.env_mode);
        }
        Ok(fixed)
    }

    /// 列出部署根目录下包含 compose 文件的服务
    pub fn list(&self) -> Result<Vec<ServiceName>> {
        let root = self.layout.root();
        if !root.is_dir() {
            debug!("部署根目录不存在: {}", root.display());
            return Ok(Vec::new());
        }

        let mut services = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Ok(name) = ServiceName::parse(&file_name.to_string_lossy()) else {
                continue;
            };
            if self.layout.compose_file(&name).is_file() {
                services.push(name);
            }
        }

        services.sort();
        Ok(services)
    }

    /// 要求服务已经初始化
    pub fn require(&self, name: &ServiceName) -> Result<PathBuf> {
        let dir = self.layout.dir(name);
        if !dir.is_dir() {
            return Err(RiggerError::service(format!(
                "服务 {} 不存在: {}（请先运行 rigger service add）",
                name,
                dir.display()
            )));
        }
        Ok(dir)
    }

    /// 在仓库中写入 CI 工作流文件，返回 (路径, 是否写入)
    pub fn write_workflow(
        &self,
        spec: &ServiceSpec,
        repo_dir: &Path,
        ci: &CiConfig,
        excludes: &[String],
        force: bool,
    ) -> Result<(PathBuf, bool)> {
        let path = repo_dir.join(Workflow::file_path(spec));
        if path.exists() && !force {
            warn!(
                "⚠️  工作流文件已存在，跳过生成（使用 --force 覆盖）: {}",
                path.display()
            );
            return Ok((path, false));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let workflow = Workflow::for_service(
            spec,
            ci,
            &self.layout.dir(&spec.name),
            excludes,
            self.dir_mode,
            self.env_mode,
        );
        fs::write(&path, workflow.render()?)?;
        info!("✅ 已生成工作流: {}", path.display());
        Ok((path, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::PortMapping;
    use tempfile::tempdir;

    fn provisioner(root: &Path) -> ServiceProvisioner {
        ServiceProvisioner::new(
            ServiceLayout::new(root, "docker-compose.yml"),
            PermissionManager::new(None),
            0o777,
            0o600,
            "app-network",
        )
    }

    fn spec(name: &str) -> ServiceSpec {
        ServiceSpec::new(
            ServiceName::parse(name).unwrap(),
            PortMapping::parse("8080:80").unwrap(),
        )
    }

    #[test]
    fn test_provision_creates_layout() {
        let dir = tempdir().unwrap();
        let p = provisioner(dir.path());

        let env = vec![("DB_HOST".to_string(), "db".to_string())];
        let report = p.provision(&spec("api"), &env, false).unwrap();

        let service_dir = dir.path().join("api");
        assert!(report.env_created);
        assert!(report.compose_written);
        assert_eq!(report.env_keys_set, 1);
        assert!(service_dir.join("logs").is_dir());
        assert!(service_dir.join("data").is_dir());
        assert_eq!(
            fs::read_to_string(service_dir.join(".env")).unwrap(),
            "DB_HOST=db\n"
        );
        let compose = fs::read_to_string(service_dir.join("docker-compose.yml")).unwrap();
        assert!(compose.contains("8080:80"));
    }

    #[test]
    fn test_provision_is_idempotent() {
        let dir = tempdir().unwrap();
        let p = provisioner(dir.path());
        p.provision(&spec("api"), &[], false).unwrap();

        let env_path = dir.path().join("api/.env");
        fs::write(&env_path, "SECRET=1\n").unwrap();
        let compose_path = dir.path().join("api/docker-compose.yml");
        fs::write(&compose_path, "# hand edited\n").unwrap();

        let report = p.provision(&spec("api"), &[], false).unwrap();
        assert!(!report.env_created);
        assert!(!report.compose_written);
        assert_eq!(fs::read_to_string(&env_path).unwrap(), "SECRET=1\n");
        assert_eq!(fs::read_to_string(&compose_path).unwrap(), "# hand edited\n");

        let forced = p.provision(&spec("api"), &[], true).unwrap();
        assert!(forced.compose_written);
        assert_ne!(fs::read_to_string(&compose_path).unwrap(), "# hand edited\n");
    }

    #[test]
    fn test_provision_merges_env() {
        let dir = tempdir().unwrap();
        let p = provisioner(dir.path());
        p.provision(&spec("api"), &[("A".to_string(), "1".to_string())], false)
            .unwrap();
        p.provision(
            &spec("api"),
            &[("B".to_string(), "2".to_string()), ("A".to_string(), "3".to_string())],
            false,
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("api/.env")).unwrap(),
            "A=3\nB=2\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_provision_modes() {
        use crate::permissions::mode_of;

        let dir = tempdir().unwrap();
        let p = provisioner(dir.path());
        p.provision(&spec("web"), &[], false).unwrap();

        let service_dir = dir.path().join("web");
        assert_eq!(mode_of(&service_dir).unwrap(), 0o777);
        assert_eq!(mode_of(&service_dir.join("logs")).unwrap(), 0o777);
        assert_eq!(mode_of(&service_dir.join("data")).unwrap(), 0o777);
        assert_eq!(mode_of(&service_dir.join(".env")).unwrap(), 0o600);
    }

    #[test]
    fn test_list_services() {
        let dir = tempdir().unwrap();
        let p = provisioner(dir.path());
        assert!(provisioner(&dir.path().join("missing")).list().unwrap().is_empty());

        p.provision(&spec("web"), &[], false).unwrap();
        p.provision(&spec("api"), &[], false).unwrap();
        fs::create_dir_all(dir.path().join("not-a-service")).unwrap();
        fs::create_dir_all(dir.path().join("Invalid Name")).unwrap();
        fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let names: Vec<String> = p.list().unwrap().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["api", "web"]);
    }

    #[test]
    fn test_require_missing_service() {
        let dir = tempdir().unwrap();
        let p = provisioner(dir.path());
        let name = ServiceName::parse("ghost").unwrap();
        assert!(matches!(p.require(&name), Err(RiggerError::Service(_))));
    }

    #[test]
    fn test_write_workflow() {
        let dir = tempdir().unwrap();
        let repo = dir.path().join("repo");
        let p = provisioner(&dir.path().join("apps"));
        let excludes = vec![".env".to_string(), "logs/".to_string()];

        let (path, written) = p
            .write_workflow(&spec("api"), &repo, &CiConfig::default(), &excludes, false)
            .unwrap();
        assert!(written);
        assert_eq!(path, repo.join(".github/workflows/deploy-api.yml"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("rsync -a --delete --exclude '.env' --exclude 'logs/'"));
        assert!(content.contains("chmod 600"));

        let (_, written_again) = p
            .write_workflow(&spec("api"), &repo, &CiConfig::default(), &excludes, false)
            .unwrap();
        assert!(!written_again);
    }
}
