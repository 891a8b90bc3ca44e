use crate::env_file;
use crate::error::{Result, RiggerError};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// 同步排除规则
///
/// - `name`：任意层级下同名的文件或目录
/// - `name/`：只匹配目录
/// - `/name` 或 `a/b`：相对于同步根目录的路径
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludePattern {
    pattern: PathBuf,
    dir_only: bool,
    anchored: bool,
}

impl ExcludePattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let dir_only = raw.ends_with('/');
        let leading = raw.starts_with('/');
        let body = raw.trim_matches('/');
        if body.is_empty() {
            return Err(RiggerError::sync(format!("无效的排除规则: '{raw}'")));
        }

        Ok(Self {
            pattern: PathBuf::from(body),
            dir_only,
            anchored: leading || body.contains('/'),
        })
    }

    pub fn matches(&self, relative: &Path, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        if self.anchored {
            relative == self.pattern
        } else {
            relative.file_name() == Some(self.pattern.as_os_str())
        }
    }
}

/// 同步结果统计
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SyncReport {
    pub copied: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub created_dirs: usize,
    pub links: usize,
    /// 目标中受保护（被排除或包含被排除内容）而未被替换的条目
    pub skipped: usize,
    /// 同步前已存在并在同步后恢复的密钥文件
    pub secret_restored: bool,
}

/// 目录同步器，语义等同于 `rsync -a --delete --exclude ...`
#[derive(Debug, Clone)]
pub struct DirectorySync {
    excludes: Vec<ExcludePattern>,
}

impl DirectorySync {
    pub fn new<S: AsRef<str>>(excludes: &[S]) -> Result<Self> {
        let excludes = excludes
            .iter()
            .map(|e| ExcludePattern::parse(e.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { excludes })
    }

    pub fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        self.excludes.iter().any(|p| p.matches(relative, is_dir))
    }

    /// 条目本身或任一上级目录被排除
    fn is_excluded_with_ancestors(&self, relative: &Path, is_dir: bool) -> bool {
        if self.is_excluded(relative, is_dir) {
            return true;
        }
        relative
            .ancestors()
            .skip(1)
            .filter(|a| !a.as_os_str().is_empty())
            .any(|a| self.is_excluded(a, true))
    }

    /// 把 source 的内容同步到 target
    ///
    /// 目标中被排除的条目既不会被覆盖也不会被删除。
    pub fn sync(&self, source: &Path, target: &Path) -> Result<SyncReport> {
        if !source.is_dir() {
            return Err(RiggerError::sync(format!(
                "源目录不存在: {}",
                source.display()
            )));
        }
        fs::create_dir_all(target)?;

        let source_root = source.canonicalize()?;
        let target_root = target.canonicalize()?;
        if source_root == target_root {
            return Err(RiggerError::sync("源目录与目标目录相同".to_string()));
        }
        if target_root.starts_with(&source_root) {
            return Err(RiggerError::sync(format!(
                "目标目录 {} 位于源目录内",
                target_root.display()
            )));
        }
        if source_root.starts_with(&target_root) {
            return Err(RiggerError::sync(format!(
                "源目录 {} 位于目标目录内",
                source_root.display()
            )));
        }

        info!(
            "📤 同步 {} → {}",
            source_root.display(),
            target_root.display()
        );

        let mut report = SyncReport::default();
        let seen = self.copy_pass(&source_root, &target_root, &mut report)?;
        self.delete_pass(&target_root, &seen, &mut report)?;

        info!(
            "✅ 同步完成: 复制 {} 个, 未变化 {} 个, 删除 {} 个",
            report.copied, report.unchanged, report.deleted
        );
        Ok(report)
    }

    fn copy_pass(
        &self,
        source_root: &Path,
        target_root: &Path,
        report: &mut SyncReport,
    ) -> Result<HashSet<PathBuf>> {
        let mut seen = HashSet::new();

        let mut walker = WalkDir::new(source_root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_dir();
                match entry.path().strip_prefix(source_root) {
                    Ok(relative) => !self.is_excluded(relative, is_dir),
                    Err(_) => true,
                }
            });

        while let Some(entry) = walker.next() {
            let entry = entry?;
            let relative = entry.path().strip_prefix(source_root)?.to_path_buf();
            let destination = target_root.join(&relative);
            let file_type = entry.file_type();
            // 不跟随目标中的符号链接
            let existing = fs::symlink_metadata(&destination).ok();
            let dest_is_dir = existing.as_ref().is_some_and(|m| m.is_dir());

            if file_type.is_dir() {
                if existing.is_some() && !dest_is_dir {
                    if self.guards_excluded(target_root, &relative)? {
                        warn!("⚠️  跳过受保护的目标条目: {}", relative.display());
                        report.skipped += 1;
                        walker.skip_current_dir();
                        continue;
                    }
                    remove_path(&destination)?;
                }
                if !dest_is_dir {
                    fs::create_dir(&destination)?;
                    report.created_dirs += 1;
                }
                copy_mode(entry.path(), &destination)?;
            } else if file_type.is_file() && files_identical(entry.path(), &destination)? {
                copy_mode(entry.path(), &destination)?;
                report.unchanged += 1;
            } else {
                if existing.is_some() {
                    if self.guards_excluded(target_root, &relative)? {
                        warn!("⚠️  跳过受保护的目标条目: {}", relative.display());
                        report.skipped += 1;
                        continue;
                    }
                    remove_path(&destination)?;
                }
                if file_type.is_symlink() {
                    copy_symlink(entry.path(), &destination)?;
                    report.links += 1;
                } else {
                    fs::copy(entry.path(), &destination)?;
                    debug!("复制: {}", relative.display());
                    report.copied += 1;
                }
            }

            seen.insert(relative);
        }

        Ok(seen)
    }

    /// 目标条目本身被排除，或是包含被排除内容的目录
    fn guards_excluded(&self, target_root: &Path, relative: &Path) -> Result<bool> {
        let destination = target_root.join(relative);
        let metadata = fs::symlink_metadata(&destination)?;
        if self.is_excluded(relative, metadata.is_dir()) {
            return Ok(true);
        }
        if !metadata.is_dir() {
            return Ok(false);
        }

        for entry in WalkDir::new(&destination).min_depth(1).follow_links(false) {
            let entry = entry?;
            let nested = entry.path().strip_prefix(target_root)?;
            if self.is_excluded(nested, entry.file_type().is_dir()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn delete_pass(
        &self,
        target_root: &Path,
        seen: &HashSet<PathBuf>,
        report: &mut SyncReport,
    ) -> Result<()> {
        // contents_first：先处理子项，目录被清空后才能删除。
        // 此模式下目录在子项之后产出，无法用 filter_entry 剪枝，逐项检查祖先
        let walker = WalkDir::new(target_root)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true);

        for entry in walker {
            let entry = entry?;
            let relative = entry.path().strip_prefix(target_root)?;
            if seen.contains(relative)
                || self.is_excluded_with_ancestors(relative, entry.file_type().is_dir())
            {
                continue;
            }

            if entry.file_type().is_dir() {
                match fs::remove_dir(entry.path()) {
                    Ok(()) => report.deleted += 1,
                    Err(e) => {
                        // 目录里还有被排除的条目
                        warn!(
                            "⚠️  保留目录 {}（包含被排除的内容）: {}",
                            relative.display(),
                            e
                        );
                    }
                }
            } else {
                fs::remove_file(entry.path())?;
                report.deleted += 1;
            }
            debug!("删除: {}", relative.display());
        }

        Ok(())
    }
}

/// 同步期间暂存的密钥文件
#[derive(Debug)]
pub struct PreservedFile {
    original: PathBuf,
    stash: Option<(tempfile::TempDir, PathBuf)>,
}

impl PreservedFile {
    /// 把现有文件复制到临时目录；文件不存在时为空操作
    pub fn stash(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!("无需暂存，文件不存在: {}", path.display());
            return Ok(Self {
                original: path.to_path_buf(),
                stash: None,
            });
        }

        let dir = tempfile::Builder::new().prefix("rigger-stash-").tempdir()?;
        let file_name = path
            .file_name()
            .ok_or_else(|| RiggerError::sync(format!("无效的文件路径: {}", path.display())))?;
        let copy = dir.path().join(file_name);
        fs::copy(path, &copy)?;
        info!("💾 已暂存 {}", path.display());

        Ok(Self {
            original: path.to_path_buf(),
            stash: Some((dir, copy)),
        })
    }

    pub fn is_stashed(&self) -> bool {
        self.stash.is_some()
    }

    /// 恢复暂存的文件并设置权限，返回是否执行了恢复
    pub fn restore(self, mode: u32) -> Result<bool> {
        let Some((_dir, copy)) = self.stash else {
            return Ok(false);
        };

        if let Some(parent) = self.original.parent() {
            fs::create_dir_all(parent)?;
        }
        if self.original.is_dir() {
            fs::remove_dir_all(&self.original)?;
        }
        fs::copy(&copy, &self.original)?;
        env_file::ensure_mode(&self.original, mode)?;
        info!("♻️  已恢复 {}", self.original.display());
        Ok(true)
    }
}

/// 暂存密钥文件、同步目录、恢复密钥文件
pub fn sync_preserving(
    syncer: &DirectorySync,
    source: &Path,
    target: &Path,
    secret_name: &str,
    secret_mode: u32,
) -> Result<SyncReport> {
    if Path::new(secret_name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(RiggerError::sync(format!("无效的密钥文件名: '{secret_name}'")));
    }

    let secret = target.join(secret_name);
    let preserved = PreservedFile::stash(&secret)?;
    let mut report = syncer.sync(source, target)?;
    report.secret_restored = preserved.restore(secret_mode)?;
    Ok(report)
}

fn files_identical(source: &Path, destination: &Path) -> Result<bool> {
    let Ok(dest_meta) = fs::symlink_metadata(destination) else {
        return Ok(false);
    };
    if !dest_meta.is_file() {
        return Ok(false);
    }
    if fs::metadata(source)?.len() != dest_meta.len() {
        return Ok(false);
    }
    Ok(sha256_file(source)? == sha256_file(destination)?)
}

/// 计算文件的 SHA-256
pub fn sha256_file(path: &Path) -> Result<[u8; 32]> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher.finalize().into())
}

fn remove_path(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn copy_mode(source: &Path, destination: &Path) -> Result<()> {
    let source_perm = fs::metadata(source)?.permissions();
    if fs::metadata(destination)?.permissions() != source_perm {
        fs::set_permissions(destination, source_perm)?;
    }
    Ok(())
}

fn copy_symlink(source: &Path, destination: &Path) -> Result<()> {
    let link_target = fs::read_link(source)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&link_target, destination)?;
    }

    #[cfg(not(unix))]
    {
        warn!(
            "非Unix系统跳过符号链接: {} -> {}",
            destination.display(),
            link_target.display()
        );
    }

    Ok(())
}
