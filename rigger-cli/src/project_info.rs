//! Rigger 项目信息模块
//!
//! rigger-cli 是面向用户的主程序，项目元数据统一在这里定义

/// 项目元数据（自动从 rigger-cli 的 Cargo.toml 同步）
pub mod metadata {
    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    /// 用户友好的显示名称（手动维护）
    pub mod display {
        pub const FRIENDLY_NAME: &str = "Rigger";

        /// 项目详细描述（比 Cargo.toml 中的描述更详细）
        pub const DESCRIPTION_LONG: &str = "为自托管 CI Runner 部署 Docker Compose 服务的主机准备目录、权限、.env 与工作流，并在 Runner 工作目录权限损坏时一键重置";
    }
}

/// 版本信息
pub mod version_info {
    /// CLI 版本（自动从 Cargo.toml 同步）
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 核心库版本
    pub const CORE_VERSION: &str = rigger_core::constants::version::CORE_VERSION;
}

/// 启动横幅
pub fn banner() -> String {
    format!(
        "🔧 {} v{} (core v{})",
        metadata::display::FRIENDLY_NAME,
        version_info::CLI_VERSION,
        version_info::CORE_VERSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_contains_versions() {
        let text = banner();
        assert!(text.contains(version_info::CLI_VERSION));
        assert!(text.starts_with("🔧 Rigger"));
    }
}
