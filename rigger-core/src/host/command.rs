use crate::error::{Result, RiggerError};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// 外部命令的执行结果
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// 失败时转换为错误，错误信息包含 stderr
    pub fn into_result(self, what: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim().to_string()
        } else {
            self.stderr.trim().to_string()
        };
        Err(RiggerError::command(format!(
            "{what} 失败 (退出码 {}): {detail}",
            self.code.map_or_else(|| "无".to_string(), |c| c.to_string())
        )))
    }

    /// stdout 与 stderr 合并后的小写文本，用于匹配提示信息
    pub fn combined_lowercase(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr).to_lowercase()
    }
}

/// 执行外部命令并捕获输出
pub async fn run_command(program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
    debug!("执行命令: {} {}", program, args.join(" "));

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|e| RiggerError::command(format!("无法执行 {program}: {e}")))?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_captures_output() {
        let output = run_command("sh", &["-c".to_string(), "echo out; echo err >&2".to_string()], None)
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_failure_into_result() {
        let output = run_command("sh", &["-c".to_string(), "echo boom >&2; exit 3".to_string()], None)
            .await
            .unwrap();
        assert_eq!(output.code, Some(3));

        let err = output.into_result("测试命令").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("退出码 3"));
        assert!(message.contains("boom"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = run_command("rigger-no-such-program", &[], None).await;
        assert!(matches!(result, Err(RiggerError::Command(_))));
    }

    #[tokio::test]
    async fn test_run_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_command("pwd", &[], Some(dir.path())).await.unwrap();
        let reported = std::path::PathBuf::from(output.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
