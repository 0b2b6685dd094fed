use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::schema::LoggingConfig;

const LOG_FILE_PREFIX: &str = "aistai.log";
const LOG_RETENTION_DAYS: u64 = 7;

/// Initialize the logging system.
///
/// `RUST_LOG` wins over `config.level`; `LOG_FORMAT=json` wins over
/// `config.format`. The returned guard must be kept alive for the file
/// writer to flush; it is `None` when file logging is disabled.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = build_filter(config);

    let format_str = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    let is_json = format_str.eq_ignore_ascii_case("json");

    let stdout_layer = if is_json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = if config.dir.trim().is_empty() {
        (None, None)
    } else {
        // rolling::daily produces aistai.log.YYYY-MM-DD
        let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = if is_json {
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .boxed()
        };
        (Some(layer), Some(guard))
    };

    Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if guard.is_some() {
        if let Err(e) = cleanup_old_logs(&config.dir, LOG_RETENTION_DAYS) {
            tracing::warn!("Failed to clean up old logs: {}", e);
        }
    }

    guard
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    for (module, level) in &config.overrides {
        match format!("{}={}", module, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(_) => eprintln!("Invalid log directive: {}={}", module, level),
        }
    }

    filter
}

/// Remove rolled log files older than `days` days
fn cleanup_old_logs(dir: &str, days: u64) -> std::io::Result<()> {
    let path = Path::new(dir);
    if !path.exists() {
        return Ok(());
    }

    let now = std::time::SystemTime::now();
    let threshold = std::time::Duration::from_secs(days * 24 * 3600);

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_ours = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_ours {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > threshold) {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }
    Ok(())
}
