use crate::constants::deploy;
use crate::error::{Result, RiggerError};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid service name regex"))
}

/// 服务名称：小写字母、数字、`-`、`_`，同时用作目录名、容器名和 Compose 服务名
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn parse(name: &str) -> Result<Self> {
        if name.len() > deploy::MAX_SERVICE_NAME_LEN {
            return Err(RiggerError::InvalidServiceName(format!(
                "'{name}' 超过 {} 个字符",
                deploy::MAX_SERVICE_NAME_LEN
            )));
        }
        if !name_pattern().is_match(name) {
            return Err(RiggerError::InvalidServiceName(format!(
                "'{name}' 只能包含小写字母、数字、'-' 和 '_'，且不能以符号开头"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServiceName {
    type Err = RiggerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// 端口映射信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    /// 主机端口
    pub host_port: u16,
    /// 容器端口
    pub container_port: u16,
}

impl PortMapping {
    pub fn new(host_port: u16, container_port: u16) -> Result<Self> {
        if host_port == 0 || container_port == 0 {
            return Err(RiggerError::service("端口号不能为 0"));
        }
        Ok(Self {
            host_port,
            container_port,
        })
    }

    /// 解析 "HOST" 或 "HOST:CONTAINER"
    pub fn parse(value: &str) -> Result<Self> {
        let parse_port = |text: &str| {
            text.trim()
                .parse::<u16>()
                .map_err(|_| RiggerError::service(format!("无效的端口: '{text}'")))
        };

        match value.split_once(':') {
            Some((host, container)) => Self::new(parse_port(host)?, parse_port(container)?),
            None => {
                let port = parse_port(value)?;
                Self::new(port, port)
            }
        }
    }

    /// docker-compose 中的端口映射写法
    pub fn compose_entry(&self) -> String {
        format!("{}:{}", self.host_port, self.container_port)
    }

    /// 检查主机端口当前是否可绑定
    pub fn is_host_port_available(&self) -> bool {
        TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], self.host_port))).is_ok()
    }
}

impl FromStr for PortMapping {
    type Err = RiggerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// 新服务的描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSpec {
    pub name: ServiceName,
    pub port: PortMapping,
}

impl ServiceSpec {
    pub fn new(name: ServiceName, port: PortMapping) -> Self {
        Self { name, port }
    }
}

/// 服务目录布局
///
/// ```text
/// <root>/<name>/
///   ├── docker-compose.yml
///   ├── .env            (0600)
///   ├── logs/           (0777)
///   └── data/           (0777)
/// ```
#[derive(Debug, Clone)]
pub struct ServiceLayout {
    root: PathBuf,
    compose_file: String,
}

impl ServiceLayout {
    pub fn new(root: impl Into<PathBuf>, compose_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            compose_file: compose_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, name: &ServiceName) -> PathBuf {
        self.root.join(name.as_str())
    }

    pub fn logs_dir(&self, name: &ServiceName) -> PathBuf {
        self.dir(name).join(deploy::LOGS_DIR_NAME)
    }

    pub fn data_dir(&self, name: &ServiceName) -> PathBuf {
        self.dir(name).join(deploy::DATA_DIR_NAME)
    }

    pub fn env_file(&self, name: &ServiceName) -> PathBuf {
        self.dir(name).join(deploy::ENV_FILE_NAME)
    }

    pub fn compose_file_name(&self) -> &str {
        &self.compose_file
    }

    pub fn compose_file(&self, name: &ServiceName) -> PathBuf {
        self.dir(name).join(&self.compose_file)
    }
}
