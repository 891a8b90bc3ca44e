use thiserror::Error;

pub type Result<T> = std::result::Result<T, RiggerError>;

#[derive(Error, Debug)]
pub enum RiggerError {
    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML 序列化错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("目录遍历错误: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("路径错误: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("外部命令执行失败: {0}")]
    Command(String),

    #[error("Runner 守护进程操作失败: {0}")]
    Daemon(String),

    #[error("权限设置失败: {0}")]
    Permission(String),

    #[error("属主解析或设置失败: {0}")]
    Ownership(String),

    #[error("无效的权限模式: {0}")]
    InvalidMode(String),

    #[error("环境变量文件错误: {0}")]
    EnvFile(String),

    #[error("无效的服务名称: {0}")]
    InvalidServiceName(String),

    #[error("服务操作失败: {0}")]
    Service(String),

    #[error("目录同步失败: {0}")]
    Sync(String),

    #[error("配置文件未找到")]
    ConfigNotFound,

    #[error("自定义错误: {0}")]
    Custom(String),
}

impl RiggerError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    pub fn daemon(msg: impl Into<String>) -> Self {
        Self::Daemon(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn ownership(msg: impl Into<String>) -> Self {
        Self::Ownership(msg.into())
    }

    pub fn env_file(msg: impl Into<String>) -> Self {
        Self::EnvFile(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync(msg.into())
    }
}
