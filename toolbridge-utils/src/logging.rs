//! Logging infrastructure for toolbridge
//!
//! Provides unified logging setup using the tracing ecosystem.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, BridgeError, Result};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "TOOLBRIDGE_LOG";

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr
    Stderr,
    /// Log to file in the state log directory
    File,
    /// Log to both stderr and file
    Both,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "toolbridge_client=debug,tungstenite=warn")
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
    /// Optional custom log file name (defaults to "toolbridge.log")
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Create config for the bridge client (stderr, filter from TOOLBRIDGE_LOG)
    pub fn client() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: std::env::var(LOG_ENV).unwrap_or_else(|_| "info".into()),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }

    /// Create config for development (verbose stderr)
    pub fn development() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "debug".into(),
            span_events: true,
            file_line: true,
            file_name: None,
        }
    }

    /// Also write to the log file (builder pattern)
    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.output = match self.output {
            LogOutput::Stderr | LogOutput::Both => LogOutput::Both,
            LogOutput::File => LogOutput::File,
        };
        self.file_name = Some(file_name.into());
        self
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| BridgeError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.span_events {
        fmt_layer.with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    } else {
        fmt_layer
    };

    let fmt_layer = if config.file_line {
        fmt_layer.with_file(true).with_line_number(true)
    } else {
        fmt_layer.with_file(false).with_line_number(false)
    };

    let file_name = config.file_name.as_deref().unwrap_or("toolbridge.log");

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| BridgeError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let file = open_log_file(&paths::log_dir(), file_name)?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(Mutex::new(file)).with_ansi(false))
                .try_init()
                .map_err(|e| BridgeError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::Both => {
            let file = open_log_file(&paths::log_dir(), file_name)?;

            let file_layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
                .map_err(|e| BridgeError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

/// Open (creating if needed) a log file in append mode
fn open_log_file(log_dir: &Path, file_name: &str) -> Result<File> {
    paths::ensure_dir(log_dir).map_err(|e| BridgeError::FileWrite {
        path: log_dir.to_path_buf(),
        source: e,
    })?;

    let log_path = log_dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| BridgeError::FileWrite {
            path: log_path,
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // ==================== LogConfig Tests ====================

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "info");
        assert!(!config.span_events);
        assert!(!config.file_line);
        assert!(config.file_name.is_none());
    }

    #[test]
    fn test_log_config_client() {
        let config = LogConfig::client();
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(!config.span_events);
        assert!(!config.file_line);
    }

    #[test]
    fn test_log_config_development() {
        let config = LogConfig::development();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "debug");
        assert!(config.span_events);
        assert!(config.file_line);
    }

    #[test]
    fn test_with_file_from_stderr() {
        let config = LogConfig::default().with_file("bridge.log");
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.file_name.as_deref(), Some("bridge.log"));
    }

    #[test]
    fn test_with_file_keeps_file_only() {
        let config = LogConfig {
            output: LogOutput::File,
            ..LogConfig::default()
        }
        .with_file("x.log");
        assert_eq!(config.output, LogOutput::File);
    }

    // ==================== Log File Tests ====================

    #[test]
    fn test_open_log_file_creates_dir() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("log");

        let _file = open_log_file(&log_dir, "toolbridge.log").unwrap();
        assert!(log_dir.join("toolbridge.log").exists());
    }

    #[test]
    fn test_open_log_file_appends() {
        use std::io::Write;

        let dir = tempdir().unwrap();
        {
            let mut file = open_log_file(dir.path(), "a.log").unwrap();
            writeln!(file, "first").unwrap();
        }
        {
            let mut file = open_log_file(dir.path(), "a.log").unwrap();
            writeln!(file, "second").unwrap();
        }

        let content = std::fs::read_to_string(dir.path().join("a.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    // Note: a successful init_logging_with_config() cannot be unit tested because the
    // global subscriber can only be installed once per process.
}
