/// 配置文件相关常量
pub mod config {
    use std::path::PathBuf;

    /// 默认配置文件名
    pub const CONFIG_FILE_NAME: &str = "rigger.toml";

    /// 隐藏配置文件名
    pub const HIDDEN_CONFIG_FILE_NAME: &str = ".rigger.toml";

    /// 用户配置目录下的子目录名
    pub const CONFIG_DIR_NAME: &str = "rigger";

    /// 按优先级排列的配置文件搜索路径
    /// 当前目录 rigger.toml -> 当前目录 .rigger.toml -> $XDG_CONFIG_HOME/rigger/rigger.toml
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from(HIDDEN_CONFIG_FILE_NAME),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
        }
        paths
    }
}

/// 权限模式常量
pub mod mode {
    /// Runner 工作目录与服务目录的权限（drwxrwxrwx）
    pub const SHARED_DIR_MODE: u32 = 0o777;

    /// 密钥文件权限（-rw-------）
    pub const SECRET_FILE_MODE: u32 = 0o600;

    /// 权限位掩码
    pub const PERMISSION_BITS: u32 = 0o7777;
}

/// 自托管 Runner 相关常量
pub mod runner {
    /// 默认 Runner 安装目录
    pub const DEFAULT_RUNNER_DIR: &str = "/home/runner/actions-runner";

    /// Runner 工作目录（相对于安装目录）
    pub const DEFAULT_WORK_DIR: &str = "_work";

    /// 默认 systemd 单元名
    pub const DEFAULT_SYSTEMD_UNIT: &str = "actions-runner.service";

    /// Runner 自带的服务控制脚本
    pub const SVC_SCRIPT: &str = "svc.sh";
}

/// 部署相关常量
pub mod deploy {
    /// 所有服务目录的父目录
    pub const DEFAULT_DEPLOY_ROOT: &str = "/opt/apps";

    /// 共享的外部 Compose 网络
    pub const DEFAULT_NETWORK: &str = "app-network";

    /// docker-compose 文件名
    pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

    /// 密钥文件名
    pub const ENV_FILE_NAME: &str = ".env";

    /// 日志目录名
    pub const LOGS_DIR_NAME: &str = "logs";

    /// 数据目录名
    pub const DATA_DIR_NAME: &str = "data";

    /// 容器内日志挂载点
    pub const CONTAINER_LOGS_PATH: &str = "/app/logs";

    /// 容器内数据挂载点
    pub const CONTAINER_DATA_PATH: &str = "/app/data";

    /// 同步时始终排除的条目，不受配置影响
    pub const MANDATORY_EXCLUDES: &[&str] = &[".env", "logs/"];

    /// 默认附加的同步排除项
    pub const DEFAULT_EXTRA_EXCLUDES: &[&str] = &[".git/", "data/"];

    /// 服务名最大长度
    pub const MAX_SERVICE_NAME_LEN: usize = 63;
}

/// CI 工作流相关常量
pub mod ci {
    /// 默认触发分支
    pub const DEFAULT_BRANCH: &str = "main";

    /// 默认 Runner 标签
    pub const DEFAULT_RUNNER_LABEL: &str = "self-hosted";

    /// 默认测试镜像
    pub const DEFAULT_TEST_IMAGE: &str = "alpine:3.20";

    /// 默认测试命令
    pub const DEFAULT_TEST_COMMAND: &str = "./run-tests.sh";

    /// 工作流文件所在目录（相对于仓库根目录）
    pub const WORKFLOW_DIR: &str = ".github/workflows";

    /// checkout action
    pub const CHECKOUT_ACTION: &str = "actions/checkout@v4";
}

/// 版本信息
pub mod version {
    /// 核心库版本
    pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
}
