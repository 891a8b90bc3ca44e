use crate::constants::{ci, config, deploy, mode, runner};
use crate::error::{Result, RiggerError};
use crate::ownership::Ownership;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub runner: RunnerConfig,
    pub deploy: DeployConfig,
    #[serde(default)]
    pub ci: CiConfig,
}

/// Runner 守护进程的控制方式
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerControl {
    /// systemctl stop/start <unit>
    #[default]
    Systemd,
    /// Runner 安装目录下的 ./svc.sh stop/start
    SvcScript,
}

impl RunnerControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerControl::Systemd => "systemd",
            RunnerControl::SvcScript => "svc-script",
        }
    }
}

/// 自托管 Runner 配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunnerConfig {
    pub dir: String,
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
    #[serde(default)]
    pub control: RunnerControl,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default = "default_true")]
    pub wipe_work_dir: bool,
}

/// 部署目录配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeployConfig {
    pub root: String,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default = "default_dir_mode")]
    pub dir_mode: String,
    #[serde(default = "default_env_mode")]
    pub env_mode: String,
    #[serde(default = "default_compose_file")]
    pub compose_file: String,
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,
}

/// CI 工作流生成配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CiConfig {
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_runner_labels")]
    pub runner_labels: Vec<String>,
    #[serde(default = "default_test_image")]
    pub test_image: String,
    #[serde(default = "default_test_command")]
    pub test_command: String,
}

fn default_true() -> bool {
    true
}

fn default_work_dir() -> String {
    runner::DEFAULT_WORK_DIR.to_string()
}

fn default_unit() -> String {
    runner::DEFAULT_SYSTEMD_UNIT.to_string()
}

fn default_network() -> String {
    deploy::DEFAULT_NETWORK.to_string()
}

fn default_dir_mode() -> String {
    format!("{:o}", mode::SHARED_DIR_MODE)
}

fn default_env_mode() -> String {
    format!("{:o}", mode::SECRET_FILE_MODE)
}

fn default_compose_file() -> String {
    deploy::COMPOSE_FILE_NAME.to_string()
}

fn default_excludes() -> Vec<String> {
    deploy::DEFAULT_EXTRA_EXCLUDES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_branch() -> String {
    ci::DEFAULT_BRANCH.to_string()
}

fn default_runner_labels() -> Vec<String> {
    vec![ci::DEFAULT_RUNNER_LABEL.to_string()]
}

fn default_test_image() -> String {
    ci::DEFAULT_TEST_IMAGE.to_string()
}

fn default_test_command() -> String {
    ci::DEFAULT_TEST_COMMAND.to_string()
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            runner_labels: default_runner_labels(),
            test_image: default_test_image(),
            test_command: default_test_command(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig {
                dir: runner::DEFAULT_RUNNER_DIR.to_string(),
                work_dir: default_work_dir(),
                control: RunnerControl::default(),
                unit: default_unit(),
                owner: None,
                wipe_work_dir: true,
            },
            deploy: DeployConfig {
                root: deploy::DEFAULT_DEPLOY_ROOT.to_string(),
                network: default_network(),
                owner: None,
                dir_mode: default_dir_mode(),
                env_mode: default_env_mode(),
                compose_file: default_compose_file(),
                excludes: default_excludes(),
            },
            ci: CiConfig::default(),
        }
    }
}

/// 解析八进制权限字符串，接受 "777"、"0777"、"0o777"
pub fn parse_mode(value: &str) -> Result<u32> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0o")
        .or_else(|| trimmed.strip_prefix("0O"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(RiggerError::InvalidMode(value.to_string()));
    }

    let parsed = u32::from_str_radix(digits, 8)
        .map_err(|_| RiggerError::InvalidMode(value.to_string()))?;

    if parsed > mode::PERMISSION_BITS {
        return Err(RiggerError::InvalidMode(value.to_string()));
    }

    Ok(parsed)
}

impl AppConfig {
    /// 按优先级查找并加载配置文件
    pub fn find_and_load_config() -> Result<Self> {
        for path in config::search_paths() {
            if path.exists() {
                tracing::info!("找到配置文件: {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        Err(RiggerError::ConfigNotFound)
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RiggerError::ConfigNotFound);
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&path, self.to_toml_with_comments())?;
        Ok(())
    }

    /// 生成带注释的TOML配置
    fn to_toml_with_comments(&self) -> String {
        const TEMPLATE: &str = include_str!("../templates/rigger.toml.template");

        let owner_line = |owner: &Option<String>| match owner {
            Some(owner) => format!("owner = {}", quote(owner)),
            None => "# owner = \"runner:runner\"".to_string(),
        };

        TEMPLATE
            .replace("{runner_dir}", &quote(&self.runner.dir))
            .replace("{runner_work_dir}", &quote(&self.runner.work_dir))
            .replace("{runner_control}", &quote(self.runner.control.as_str()))
            .replace("{runner_unit}", &quote(&self.runner.unit))
            .replace("{runner_wipe}", &self.runner.wipe_work_dir.to_string())
            .replace("{runner_owner_line}", &owner_line(&self.runner.owner))
            .replace("{deploy_root}", &quote(&self.deploy.root))
            .replace("{deploy_network}", &quote(&self.deploy.network))
            .replace("{deploy_dir_mode}", &quote(&self.deploy.dir_mode))
            .replace("{deploy_env_mode}", &quote(&self.deploy.env_mode))
            .replace("{deploy_compose_file}", &quote(&self.deploy.compose_file))
            .replace("{deploy_excludes}", &quote_list(&self.deploy.excludes))
            .replace("{deploy_owner_line}", &owner_line(&self.deploy.owner))
            .replace("{ci_branch}", &quote(&self.ci.branch))
            .replace("{ci_runner_labels}", &quote_list(&self.ci.runner_labels))
            .replace("{ci_test_image}", &quote(&self.ci.test_image))
            .replace("{ci_test_command}", &quote(&self.ci.test_command))
    }

    /// 校验配置的一致性
    pub fn validate(&self) -> Result<()> {
        parse_mode(&self.deploy.dir_mode)?;
        parse_mode(&self.deploy.env_mode)?;

        if self.deploy.network.trim().is_empty() {
            return Err(RiggerError::custom("deploy.network 不能为空"));
        }
        if self.deploy.root.trim().is_empty() {
            return Err(RiggerError::custom("deploy.root 不能为空"));
        }
        if self.runner.dir.trim().is_empty() {
            return Err(RiggerError::custom("runner.dir 不能为空"));
        }
        if self.ci.runner_labels.is_empty() {
            return Err(RiggerError::custom("ci.runner_labels 至少需要一个标签"));
        }

        for owner in [&self.runner.owner, &self.deploy.owner].into_iter().flatten() {
            Ownership::check_syntax(owner)?;
        }

        Ok(())
    }

    /// Runner 安装目录
    pub fn runner_dir(&self) -> PathBuf {
        PathBuf::from(&self.runner.dir)
    }

    /// Runner 工作目录，相对路径基于安装目录
    pub fn runner_work_dir(&self) -> PathBuf {
        let work_dir = Path::new(&self.runner.work_dir);
        if work_dir.is_absolute() {
            work_dir.to_path_buf()
        } else {
            self.runner_dir().join(work_dir)
        }
    }

    /// 部署根目录
    pub fn deploy_root(&self) -> PathBuf {
        PathBuf::from(&self.deploy.root)
    }

    pub fn dir_mode(&self) -> Result<u32> {
        parse_mode(&self.deploy.dir_mode)
    }

    pub fn env_mode(&self) -> Result<u32> {
        parse_mode(&self.deploy.env_mode)
    }

    /// 解析 Runner 目录属主
    pub fn runner_owner(&self) -> Result<Option<Ownership>> {
        self.runner.owner.as_deref().map(Ownership::parse).transpose()
    }

    /// 解析服务目录属主
    pub fn deploy_owner(&self) -> Result<Option<Ownership>> {
        self.deploy.owner.as_deref().map(Ownership::parse).transpose()
    }

    /// 同步排除列表，.env 与 logs/ 始终在列
    pub fn sync_excludes(&self) -> Vec<String> {
        let mut excludes: Vec<String> = deploy::MANDATORY_EXCLUDES
            .iter()
            .map(|s| s.to_string())
            .collect();
        for exclude in &self.deploy.excludes {
            if !excludes.contains(exclude) {
                excludes.push(exclude.clone());
            }
        }
        excludes
    }
}

fn quote(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn quote_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote(v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("777").unwrap(), 0o777);
        assert_eq!(parse_mode("0777").unwrap(), 0o777);
        assert_eq!(parse_mode("0o600").unwrap(), 0o600);
        assert_eq!(parse_mode(" 600 ").unwrap(), 0o600);
        assert!(parse_mode("").is_err());
        assert!(parse_mode("888").is_err());
        assert!(parse_mode("17777").is_err());
        assert!(parse_mode("rwx").is_err());
    }

    #[test]
    fn test_default_config_roundtrip_through_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rigger.toml");

        let config = AppConfig::default();
        config.save_to_file(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# owner = \"runner:runner\""));

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_owner_and_quotes_survive_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/rigger.toml");

        let mut config = AppConfig::default();
        config.runner.owner = Some("1000:1000".to_string());
        config.runner.control = RunnerControl::SvcScript;
        config.ci.test_command = "make test ARGS=\"-v\"".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.runner.owner.as_deref(), Some("1000:1000"));
        assert_eq!(loaded.runner.control, RunnerControl::SvcScript);
        assert_eq!(loaded.ci.test_command, "make test ARGS=\"-v\"");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[runner]
dir = "/srv/runner"

[deploy]
root = "/srv/apps"
"#,
        )
        .unwrap();

        assert_eq!(config.runner_work_dir(), PathBuf::from("/srv/runner/_work"));
        assert_eq!(config.deploy_root(), PathBuf::from("/srv/apps"));
        assert_eq!(config.dir_mode().unwrap(), 0o777);
        assert_eq!(config.env_mode().unwrap(), 0o600);
        assert_eq!(config.ci.branch, "main");
        assert!(config.runner.wipe_work_dir);
    }

    #[test]
    fn test_absolute_work_dir() {
        let mut config = AppConfig::default();
        config.runner.work_dir = "/var/lib/runner-work".to_string();
        assert_eq!(
            config.runner_work_dir(),
            PathBuf::from("/var/lib/runner-work")
        );
    }

    #[test]
    fn test_sync_excludes_always_contain_secrets_and_logs() {
        let mut config = AppConfig::default();
        config.deploy.excludes = vec!["node_modules/".to_string(), ".env".to_string()];

        let excludes = config.sync_excludes();
        assert_eq!(excludes, vec![".env", "logs/", "node_modules/"]);
    }

    #[test]
    fn test_load_missing_file_is_config_not_found() {
        let dir = tempdir().unwrap();
        let result = AppConfig::load_from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(RiggerError::ConfigNotFound)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.deploy.dir_mode = "999".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.deploy.network = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.deploy.owner = Some("runner:".to_string());
        assert!(config.validate().is_err());
    }
}
