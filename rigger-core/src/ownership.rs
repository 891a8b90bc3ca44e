use crate::error::{Result, RiggerError};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// 文件属主（UID/GID）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// 检测当前进程的有效 UID 和 GID
    pub fn current() -> Self {
        #[cfg(unix)]
        {
            use nix::unistd::{getegid, geteuid};
            let uid = geteuid().as_raw();
            let gid = getegid().as_raw();
            debug!("当前进程用户 - UID: {}, GID: {}", uid, gid);
            Ownership { uid, gid }
        }

        #[cfg(not(unix))]
        {
            // 非Unix系统使用默认值
            Ownership {
                uid: 1000,
                gid: 1000,
            }
        }
    }

    /// 只检查 "user[:group]" 的格式，不查询系统用户
    pub fn check_syntax(spec: &str) -> Result<()> {
        let (user, group) = split_spec(spec);
        if user.is_empty() || group.is_some_and(str::is_empty) {
            return Err(RiggerError::ownership(format!(
                "格式应为 user[:group]，实际为 '{spec}'"
            )));
        }
        Ok(())
    }

    /// 解析 "user:group"、"uid:gid" 或单独的 "user"
    ///
    /// 名称通过系统用户数据库解析；只给出用户时使用该用户的主组。
    pub fn parse(spec: &str) -> Result<Self> {
        Self::check_syntax(spec)?;
        let (user, group) = split_spec(spec);

        let (uid, primary_gid) = resolve_user(user)?;
        let gid = match group {
            Some(group) => resolve_group(group)?,
            None => primary_gid.ok_or_else(|| {
                RiggerError::ownership(format!("数字用户 '{user}' 需要显式指定组"))
            })?,
        };

        Ok(Ownership { uid, gid })
    }

    /// 设置属主，不跟随符号链接
    pub fn apply(&self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::lchown(path, Some(self.uid), Some(self.gid)).map_err(|e| {
                RiggerError::ownership(format!("设置 {} 属主为 {} 失败: {e}", path.display(), self))
            })?;
        }

        #[cfg(not(unix))]
        {
            debug!("非Unix系统跳过属主设置: {}", path.display());
        }

        Ok(())
    }

    /// 读取路径当前的属主
    pub fn of(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let metadata = std::fs::symlink_metadata(path)?;
            Ok(Ownership {
                uid: metadata.uid(),
                gid: metadata.gid(),
            })
        }

        #[cfg(not(unix))]
        {
            let _ = path;
            Ok(Self::current())
        }
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

fn split_spec(spec: &str) -> (&str, Option<&str>) {
    let spec = spec.trim();
    match spec.split_once(':') {
        Some((user, group)) => (user, Some(group)),
        None => (spec, None),
    }
}

/// 返回 (uid, 主组gid)，数字形式的用户没有主组信息
fn resolve_user(user: &str) -> Result<(u32, Option<u32>)> {
    if let Ok(uid) = user.parse::<u32>() {
        return Ok((uid, None));
    }

    #[cfg(unix)]
    {
        use nix::unistd::User;
        let found = User::from_name(user)
            .map_err(|e| RiggerError::ownership(format!("查询用户 '{user}' 失败: {e}")))?
            .ok_or_else(|| RiggerError::ownership(format!("用户 '{user}' 不存在")))?;
        Ok((found.uid.as_raw(), Some(found.gid.as_raw())))
    }

    #[cfg(not(unix))]
    {
        Err(RiggerError::ownership(format!(
            "当前平台只支持数字 UID: '{user}'"
        )))
    }
}

fn resolve_group(group: &str) -> Result<u32> {
    if let Ok(gid) = group.parse::<u32>() {
        return Ok(gid);
    }

    #[cfg(unix)]
    {
        use nix::unistd::Group;
        let found = Group::from_name(group)
            .map_err(|e| RiggerError::ownership(format!("查询组 '{group}' 失败: {e}")))?
            .ok_or_else(|| RiggerError::ownership(format!("组 '{group}' 不存在")))?;
        Ok(found.gid.as_raw())
    }

    #[cfg(not(unix))]
    {
        Err(RiggerError::ownership(format!(
            "当前平台只支持数字 GID: '{group}'"
        )))
    }
}
