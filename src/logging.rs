use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::EngineConfig;

const LOG_FILE_PREFIX: &str = "mastery-engine.log";

pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Install the engine's tracing subscriber: stdout at the configured level,
/// plus a daily-rolling log file when `ENABLE_FILE_LOGS` is set. Safe to
/// call when the host already installed a subscriber; the returned guard is
/// `Some` only while file logs are being flushed.
pub fn init_tracing(config: &EngineConfig) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if file_logging_enabled() {
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
        if let Err(err) = std::fs::create_dir_all(&log_dir) {
            eprintln!("failed to create log directory {log_dir}: {err}");
        } else {
            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);

            let installed = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init()
                .is_ok();

            return installed.then_some(FileLogGuard { _guard: guard });
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .ok();

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tolerates_repeated_calls() {
        let config = EngineConfig::default();
        init_tracing(&config);
        // The global subscriber is already set; a second call must neither
        // panic nor hand out a file guard.
        assert!(init_tracing(&config).is_none());
    }

    #[test]
    fn test_bad_filter_falls_back() {
        let config = EngineConfig {
            log_level: "not a [valid] filter!!".to_string(),
            ..EngineConfig::default()
        };
        // Falls back to the "info" filter instead of failing.
        init_tracing(&config);
    }
}
