use rigger_core::{config::AppConfig, constants::config, error::Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 生成默认配置文件，返回是否写入
pub fn run_init(force: bool, path: Option<&Path>) -> Result<bool> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE_NAME));

    info!("🔧 Rigger 初始化");
    info!("================");

    if path.exists() && !force {
        warn!("⚠️  配置文件已存在: {}", path.display());
        info!("如果您要重新初始化，请使用 --force 参数");
        info!("示例: rigger init --force");
        return Ok(false);
    }

    let config = AppConfig::default();
    config.save_to_file(&path)?;
    info!("   ✅ 创建配置文件: {}", path.display());

    info!("🎉 初始化完成！");
    info!("");
    info!("📝 接下来的步骤:");
    info!("   1️⃣  编辑 {}，确认 runner.dir 与 deploy.root", path.display());
    info!("   2️⃣  运行 'rigger service add <name> --port 8080:80' 初始化服务");
    info!("   3️⃣  运行 'rigger check' 检查目录权限");
    info!("");
    info!("💡 提示:");
    info!("   - Runner 工作目录权限损坏时运行 'rigger runner reset'");
    info!("   - 使用 'rigger --help' 查看所有可用命令");

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rigger.toml");

        assert!(run_init(false, Some(&path)).unwrap());
        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn test_init_respects_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rigger.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        assert!(!run_init(false, Some(&path)).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        assert!(run_init(true, Some(&path)).unwrap());
        assert!(AppConfig::load_from_file(&path).is_ok());
    }
}
