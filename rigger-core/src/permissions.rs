use crate::error::{Result, RiggerError};
use crate::ownership::Ownership;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// 目录权限管理器 - 负责权限位与属主的统一设置
#[derive(Debug, Clone, Default)]
pub struct PermissionManager {
    owner: Option<Ownership>,
}

/// 单个路径的权限检查结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PathCheck {
    pub path: PathBuf,
    pub exists: bool,
    /// 实际权限位（八进制字符串）
    pub mode: Option<String>,
    pub expected_mode: String,
    pub owner: Option<String>,
    pub expected_owner: Option<String>,
    /// 路径本身是符号链接（总是视为不合格）
    pub symlink: bool,
    pub ok: bool,
}

impl PermissionManager {
    /// 创建新的权限管理器，owner 为空时不修改属主
    pub fn new(owner: Option<Ownership>) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Option<Ownership> {
        self.owner
    }

    /// 确保目录存在并设置权限（已存在不视为错误）
    pub fn ensure_dir(&self, path: &Path, mode: u32) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                RiggerError::permission(format!("创建目录 {} 失败: {e}", path.display()))
            })?;
            info!("✅ 已创建目录: {}", path.display());
        }

        // create_dir_all 受 umask 影响，这里显式设置
        self.set_mode(path, mode)?;
        self.apply_owner(path)?;
        debug!("目录权限 {} → {:o}", path.display(), mode);
        Ok(())
    }

    /// 重建目录树：可选删除后重新创建，并递归应用权限与属主
    pub fn recreate_dir(&self, path: &Path, mode: u32, wipe: bool) -> Result<()> {
        if wipe {
            match fs::remove_dir_all(path) {
                Ok(()) => info!("🗑️  已删除目录: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("目录不存在，跳过删除: {}", path.display());
                }
                Err(e) => {
                    return Err(RiggerError::permission(format!(
                        "删除目录 {} 失败: {e}",
                        path.display()
                    )));
                }
            }
        }

        self.ensure_dir(path, mode)?;
        self.apply_recursive(path, mode)
    }

    /// 递归设置权限与属主（chmod -R / chown -R），不跟随符号链接
    pub fn apply_recursive(&self, root: &Path, mode: u32) -> Result<()> {
        let mut count = 0usize;
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry?;
            let path = entry.path();

            if entry.path_is_symlink() {
                debug!("跳过符号链接: {}", path.display());
                continue;
            }

            self.set_mode(path, mode)?;
            self.apply_owner(path)?;
            count += 1;
        }

        info!(
            "🔑 已递归设置权限 {} → {:o} ({} 项)",
            root.display(),
            mode,
            count
        );
        Ok(())
    }

    /// 设置单个路径的权限位
    pub fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
                RiggerError::permission(format!("设置 {} 权限失败: {e}", path.display()))
            })?;
        }

        #[cfg(not(unix))]
        {
            debug!("非Unix系统跳过权限设置: {} (mode: {:o})", path.display(), mode);
        }

        Ok(())
    }

    fn apply_owner(&self, path: &Path) -> Result<()> {
        if let Some(owner) = &self.owner {
            owner.apply(path)?;
        }
        Ok(())
    }

    /// 检查路径的权限位与属主是否符合预期
    pub fn inspect(&self, path: &Path, expected_mode: u32) -> PathCheck {
        let expected_owner = self.owner.map(|o| o.to_string());

        let (exists, symlink, mode, owner) = match fs::symlink_metadata(path) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                warn!("⚠️  {} 是符号链接", path.display());
                (true, true, None, Ownership::of(path).ok())
            }
            Ok(_) => (
                true,
                false,
                mode_of(path).ok(),
                Ownership::of(path).ok(),
            ),
            Err(_) => (false, false, None, None),
        };

        let mode_ok = mode == Some(expected_mode);
        let owner_ok = match (&self.owner, &owner) {
            (None, _) => true,
            (Some(expected), Some(actual)) => expected == actual,
            (Some(_), None) => false,
        };

        PathCheck {
            path: path.to_path_buf(),
            exists,
            mode: mode.map(|m| format!("{m:o}")),
            expected_mode: format!("{expected_mode:o}"),
            owner: owner.map(|o| o.to_string()),
            expected_owner,
            symlink,
            ok: exists && !symlink && mode_ok && owner_ok,
        }
    }
}

/// 读取路径的权限位（不含文件类型位）
pub fn mode_of(path: &Path) -> Result<u32> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(path)?;
        Ok(metadata.permissions().mode() & crate::constants::mode::PERMISSION_BITS)
    }

    #[cfg(not(unix))]
    {
        let _ = fs::metadata(path)?;
        Ok(0)
    }
}
