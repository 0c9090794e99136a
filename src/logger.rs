use std::path::Path;

/// Simplifies file paths by extracting relevant parts from cargo registry paths
///
/// # Arguments
/// * `file_path` - The file path to simplify
///
/// # Returns
/// A simplified version of the file path
fn simplify_file_path(file_path: &str) -> String {
    if file_path.contains("crs") {
        if let Some(pos) = file_path.rfind("/src/") {
            return file_path[(pos + 1)..].to_string();
        }
    }

    if let Some((_, suffix)) = file_path.split_once(".cargo/registry/src/") {
        if let Some(first_slash) = suffix.find('/') {
            suffix[(first_slash + 1)..].to_string()
        } else {
            suffix.to_string()
        }
    } else {
        file_path.to_string()
    }
}

/// Formats log messages for console output with a simplified format
///
/// # Arguments
/// * `out` - The format callback to write the formatted message
/// * `message` - The log message to format
/// * `record` - The log record containing metadata
pub fn console_log_formatter(
    out: fern::FormatCallback,
    message: &std::fmt::Arguments,
    record: &log::Record,
) {
    let level = record.level();
    let level_color = match level {
        log::Level::Error => "\x1B[31m", // red
        log::Level::Warn => "\x1B[33m",  // yellow
        log::Level::Info => "\x1B[32m",  // green
        log::Level::Debug => "\x1B[0m",  // normal
        log::Level::Trace => "\x1B[35m", // purple
    };
    let reset = "\x1B[0m";

    out.finish(format_args!(
        "{}{}[{}] {}:{} {}{}",
        level_color,
        chrono::Local::now().format("%H:%M:%S.%3f "),
        get_level(level),
        simplify_file_path(record.file().unwrap_or("")),
        record.line().unwrap_or(0),
        message,
        reset,
    ))
}

/// Formats log messages for file output with detailed information
pub fn file_log_formatter(
    out: fern::FormatCallback,
    message: &std::fmt::Arguments,
    record: &log::Record,
) {
    out.finish(format_args!(
        "{}[{}] {}:{} {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        get_level(record.level()),
        simplify_file_path(record.file().unwrap_or("")),
        record.line().unwrap_or(0),
        message
    ))
}

/// Sets up logging for an embedding application: concise console output
/// plus a detailed log file under `log_dir`.
///
/// # Arguments
/// * `log_dir` - Directory the log file is created in
pub fn setup_logger(log_dir: &Path) -> Result<(), fern::InitError> {
    std::fs::create_dir_all(log_dir)?;
    let log_file_path = log_dir.join("crs-analysis.log");

    let stdout_dispatcher = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .format(console_log_formatter)
        .chain(std::io::stdout());

    let file_dispatcher = fern::Dispatch::new()
        .level(log::LevelFilter::Info)
        .format(file_log_formatter)
        .chain(fern::log_file(&log_file_path)?);

    fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .chain(stdout_dispatcher)
        .chain(file_dispatcher)
        .apply()?;

    log::debug!(
        "Logger initialized successfully, log file path: {:?}",
        log_file_path
    );
    Ok(())
}

fn get_level(level: log::Level) -> String {
    match level {
        log::Level::Error => "E",
        log::Level::Warn => "W",
        log::Level::Info => "I",
        log::Level::Debug => "D",
        log::Level::Trace => "T",
    }
    .to_string()
}

#[cfg(test)]
use log::SetLoggerError;

/// 为测试设置日志记录器
///
/// 在测试环境中只输出到控制台，使用简洁格式
#[cfg(test)]
pub fn setup_test_logger() -> Result<(), SetLoggerError> {
    if log::logger().enabled(&log::Metadata::builder().level(log::Level::Debug).build()) {
        return Ok(()); // 日志器已经初始化
    }

    fern::Dispatch::new()
        .format(console_log_formatter)
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()
}
