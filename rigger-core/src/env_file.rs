use crate::error::{Result, RiggerError};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid key regex"))
}

/// 检查环境变量名是否合法
pub fn is_valid_key(key: &str) -> bool {
    key_pattern().is_match(key)
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Entry {
        key: String,
        value: String,
        export: bool,
    },
    /// 注释、空行以及无法识别的行，原样保留
    Raw(String),
}

impl Line {
    fn render(&self) -> String {
        match self {
            Line::Entry { key, value, export } => {
                if *export {
                    format!("export {key}={value}")
                } else {
                    format!("{key}={value}")
                }
            }
            Line::Raw(text) => text.clone(),
        }
    }
}

/// `.env` 密钥文件（KEY=VALUE 行格式），保留注释、空行和顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

impl EnvFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取文件，文件不存在时返回空内容
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(".env 文件不存在，使用空内容: {}", path.display());
                Ok(Self::new())
            }
            Err(e) => Err(RiggerError::env_file(format!(
                "读取 {} 失败: {e}",
                path.display()
            ))),
        }
    }

    pub fn parse(content: &str) -> Self {
        let lines = content.lines().map(parse_line).collect();
        Self { lines }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 设置变量：原位替换第一次出现的行并移除后续重复项，否则追加到末尾
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if !is_valid_key(key) {
            return Err(RiggerError::env_file(format!("无效的变量名: '{key}'")));
        }
        if value.contains('\n') || value.contains('\r') {
            return Err(RiggerError::env_file(format!("变量 {key} 的值不能包含换行")));
        }

        let mut replaced = false;
        self.lines.retain_mut(|line| {
            let Line::Entry { key: k, value: v, .. } = line else {
                return true;
            };
            if k.as_str() != key {
                return true;
            }
            if replaced {
                return false;
            }
            *v = value.to_string();
            replaced = true;
            true
        });

        if !replaced {
            self.lines.push(Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
                export: false,
            });
        }

        Ok(())
    }

    /// 删除变量的所有出现，返回是否存在过
    pub fn unset(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, Line::Entry { key: k, .. } if k == key));
        before != self.lines.len()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries().map(|(k, _)| k).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, value, .. } => Some((key.as_str(), value.as_str())),
            Line::Raw(_) => None,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        out
    }

    /// 原子写入：同目录临时文件写完后替换，最终权限为 mode
    pub fn save(&self, path: &Path, mode: u32) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            RiggerError::env_file(format!("在 {} 创建临时文件失败: {e}", dir.display()))
        })?;
        temp.write_all(self.render().as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| {
            RiggerError::env_file(format!("写入 {} 失败: {}", path.display(), e.error))
        })?;

        ensure_mode(path, mode)?;
        info!("🔐 已写入 {} (mode {:o})", path.display(), mode);
        Ok(())
    }
}

/// 修正已存在文件的权限，文件不存在时返回 false
pub fn ensure_mode(path: &Path, mode: u32) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

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

    Ok(true)
}

/// 列表显示用的脱敏值
pub fn masked(value: &str) -> String {
    let visible: String = value.chars().take(2).collect();
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

/// 解析命令行形式的 KEY=VALUE
pub fn parse_assignment(text: &str) -> Result<(String, String)> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| RiggerError::env_file(format!("应为 KEY=VALUE 格式: '{text}'")))?;
    let key = key.trim();
    if !is_valid_key(key) {
        return Err(RiggerError::env_file(format!("无效的变量名: '{key}'")));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_line(raw: &str) -> Line {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Raw(raw.to_string());
    }

    let (body, export) = match trimmed.strip_prefix("export ") {
        Some(rest) => (rest.trim_start(), true),
        None => (trimmed, false),
    };

    match body.split_once('=') {
        Some((key, value)) if is_valid_key(key.trim_end()) => Line::Entry {
            key: key.trim_end().to_string(),
            value: value.to_string(),
            export,
        },
        _ => {
            warn!("⚠️  无法识别的 .env 行，原样保留: {}", raw);
            Line::Raw(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "# database\nDB_HOST=db\nDB_PASS=s3cr=et\n\nexport API_KEY=abc123\nnot a line\n";

    #[test]
    fn test_parse_preserves_everything() {
        let env = EnvFile::parse(SAMPLE);
        assert_eq!(env.get("DB_HOST"), Some("db"));
        assert_eq!(env.get("DB_PASS"), Some("s3cr=et"));
        assert_eq!(env.get("API_KEY"), Some("abc123"));
        assert_eq!(env.keys(), vec!["DB_HOST", "DB_PASS", "API_KEY"]);
        assert_eq!(env.render(), SAMPLE);
    }

    #[test]
    fn test_set_replaces_in_place_and_dedups() {
        let mut env = EnvFile::parse("A=1\nB=2\nA=3\n");
        env.set("A", "9").unwrap();
        assert_eq!(env.render(), "A=9\nB=2\n");

        env.set("C", "x y").unwrap();
        assert_eq!(env.render(), "A=9\nB=2\nC=x y\n");
    }

    #[test]
    fn test_set_keeps_export_prefix() {
        let mut env = EnvFile::parse("export TOKEN=old\n");
        env.set("TOKEN", "new").unwrap();
        assert_eq!(env.render(), "export TOKEN=new\n");
    }

    #[test]
    fn test_set_rejects_invalid_input() {
        let mut env = EnvFile::new();
        assert!(env.set("1BAD", "x").is_err());
        assert!(env.set("WITH-DASH", "x").is_err());
        assert!(env.set("GOOD", "multi\nline").is_err());
        assert!(env.set("_GOOD_1", "ok").is_ok());
    }

    #[test]
    fn test_unset() {
        let mut env = EnvFile::parse("A=1\n# keep\nA=2\nB=3\n");
        assert!(env.unset("A"));
        assert!(!env.unset("A"));
        assert_eq!(env.render(), "# keep\nB=3\n");
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("URL=postgres://u:p@h/db?x=1").unwrap(),
            ("URL".to_string(), "postgres://u:p@h/db?x=1".to_string())
        );
        assert_eq!(
            parse_assignment("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_assignment("NOEQUALS").is_err());
        assert!(parse_assignment("=value").is_err());
    }

    #[test]
    fn test_masked() {
        assert_eq!(masked(""), "****");
        assert_eq!(masked("abcd"), "****");
        assert_eq!(masked("abcdef"), "ab****");
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempdir().unwrap();
        let env = EnvFile::load(&dir.path().join(".env")).unwrap();
        assert!(env.keys().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_sets_secret_mode() {
        use crate::permissions::mode_of;

        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "OLD=1\n").unwrap();
        std::fs::set_permissions(
            &path,
            <std::fs::Permissions as std::os::unix::fs::PermissionsExt>::from_mode(0o644),
        )
        .unwrap();

        let mut env = EnvFile::load(&path).unwrap();
        env.set("NEW", "2").unwrap();
        env.save(&path, 0o600).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "OLD=1\nNEW=2\n");
        assert_eq!(mode_of(&path).unwrap(), 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_mode() {
        use crate::permissions::mode_of;

        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        assert!(!ensure_mode(&path, 0o600).unwrap());

        std::fs::write(&path, "A=1\n").unwrap();
        assert!(ensure_mode(&path, 0o600).unwrap());
        assert_eq!(mode_of(&path).unwrap(), 0o600);
    }
}
