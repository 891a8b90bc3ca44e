use crate::app::CliApp;
use crate::utils::parse_assignments;
use anyhow::{Result, anyhow};
use rigger_core::env_file::{self, EnvFile};
use rigger_core::service::ServiceName;
use tracing::{info, warn};

fn load(app: &CliApp, service: &str) -> Result<(ServiceName, EnvFile)> {
    let name = app.existing_service(service)?;
    let env = EnvFile::load(&app.provisioner.layout().env_file(&name))?;
    Ok((name, env))
}

fn save(app: &CliApp, name: &ServiceName, env: &EnvFile) -> Result<()> {
    let path = app.provisioner.layout().env_file(name);
    env.save(&path, app.provisioner.env_mode())?;
    Ok(())
}

pub fn run_env_set(app: &CliApp, service: &str, assignments: &[String]) -> Result<()> {
    let pairs = parse_assignments(assignments)?;
    let (name, mut env) = load(app, service)?;
    for (key, value) in &pairs {
        env.set(key, value)?;
    }
    save(app, &name, &env)?;
    info!("✅ {} 已写入 {} 个变量", name, pairs.len());
    Ok(())
}

pub fn run_env_unset(app: &CliApp, service: &str, keys: &[String]) -> Result<()> {
    let (name, mut env) = load(app, service)?;
    let mut removed = 0;
    for key in keys {
        if env.unset(key) {
            removed += 1;
        } else {
            warn!("⚠️  {} 中没有变量 {}", name, key);
        }
    }
    if removed > 0 {
        save(app, &name, &env)?;
    }
    info!("🗑️  {} 已删除 {} 个变量", name, removed);
    Ok(())
}

pub fn run_env_get(app: &CliApp, service: &str, key: &str) -> Result<()> {
    let (name, env) = load(app, service)?;
    let value = env
        .get(key)
        .ok_or_else(|| anyhow!("{} 中没有变量 {}", name, key))?;
    println!("{value}");
    Ok(())
}

/// 列出变量，默认只显示前两个字符
pub fn run_env_list(app: &CliApp, service: &str, reveal: bool) -> Result<()> {
    let (_, env) = load(app, service)?;
    for (key, value) in env.entries() {
        if reveal {
            println!("{key}={value}");
        } else {
            println!("{key}={}", env_file::masked(value));
        }
    }
    Ok(())
}

pub fn run_env_fix_perms(app: &CliApp, service: Option<&str>) -> Result<()> {
    let services = match service {
        Some(service) => vec![app.existing_service(service)?],
        None => app.provisioner.list()?,
    };

    let mut fixed = 0;
    for name in &services {
        if app.provisioner.fix_env_permissions(name)? {
            fixed += 1;
        }
    }
    info!("🔐 已修正 {} 个 .env 文件", fixed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigger_core::config::AppConfig;
    use std::fs;
    use tempfile::tempdir;

    fn app_with_service(root: &std::path::Path) -> CliApp {
        let mut config = AppConfig::default();
        config.deploy.root = root.display().to_string();
        fs::create_dir_all(root.join("api")).unwrap();
        CliApp::from_config(config).unwrap()
    }

    #[test]
    fn test_set_and_unset() {
        let dir = tempdir().unwrap();
        let app = app_with_service(dir.path());
        let env_path = dir.path().join("api/.env");
        fs::write(&env_path, "# keep\nA=1\n").unwrap();

        run_env_set(&app, "api", &["B=2".to_string(), "A=3".to_string()]).unwrap();
        assert_eq!(fs::read_to_string(&env_path).unwrap(), "# keep\nA=3\nB=2\n");

        run_env_unset(&app, "api", &["A".to_string(), "MISSING".to_string()]).unwrap();
        assert_eq!(fs::read_to_string(&env_path).unwrap(), "# keep\nB=2\n");

        assert!(run_env_get(&app, "api", "B").is_ok());
        assert!(run_env_get(&app, "api", "A").is_err());
    }

    #[test]
    fn test_set_rejects_invalid_assignment() {
        let dir = tempdir().unwrap();
        let app = app_with_service(dir.path());
        assert!(run_env_set(&app, "api", &["1BAD=x".to_string()]).is_err());
        assert!(!dir.path().join("api/.env").exists());
    }

    #[test]
    fn test_unknown_service() {
        let dir = tempdir().unwrap();
        let app = app_with_service(dir.path());
        assert!(run_env_set(&app, "web", &["A=1".to_string()]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_fix_perms_single_service() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let app = app_with_service(dir.path());
        let env_path = dir.path().join("api/.env");
        fs::write(&env_path, "A=1\n").unwrap();
        fs::set_permissions(&env_path, fs::Permissions::from_mode(0o644)).unwrap();

        run_env_fix_perms(&app, Some("api")).unwrap();
        let mode = fs::metadata(&env_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
