use tracing_appender::non_blocking::WorkerGuard;

/// # Rigger 日志系统使用说明
///
/// 库代码只使用 `tracing` 宏，日志配置由 `main.rs` 调用 `setup_logging()` 完成。
///
/// ## 日志配置选项
///
/// - `-v, --verbose`：启用详细日志模式（DEBUG 级别）
/// - `RUST_LOG`：标准的 Rust 日志级别控制（如 `debug`, `info`, `warn`, `error`）
/// - `RIGGER_LOG_FILE`：日志文件路径，设置后日志追加到文件而非终端
///
/// ```bash
/// rigger -v runner reset --dry-run
/// RIGGER_LOG_FILE=/var/log/rigger.log rigger runner reset
/// RUST_LOG=rigger_core::sync=debug rigger deploy api --source .
/// ```
///
/// 写文件时返回的 `WorkerGuard` 必须保持到进程结束，否则缓冲中的日志会丢失。
pub fn setup_logging(verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(log_file) = std::env::var_os("RIGGER_LOG_FILE") {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
        {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                // 文件输出使用详细格式便于排查
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!(
                    "⚠️  无法打开日志文件 {}: {e}，改为输出到终端",
                    std::path::Path::new(&log_file).display()
                );
            }
        }
    }

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(false)
        .without_time()
        .compact()
        .init();
    None
}

/// 解析 `KEY=VALUE` 列表
pub fn parse_assignments(values: &[String]) -> rigger_core::Result<Vec<(String, String)>> {
    values
        .iter()
        .map(|v| rigger_core::env_file::parse_assignment(v))
        .collect()
}
