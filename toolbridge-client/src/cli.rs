//! Command-line argument parsing for the toolbridge client
//!
//! Uses clap for argument parsing with derive macros.

use clap::Parser;
use std::path::PathBuf;

use toolbridge_client::BridgeConfig;
use toolbridge_utils::LogConfig;

/// toolbridge - answers agent tool calls over the console bridge
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Console origin to connect to
    ///
    /// The bridge endpoint is derived from it: http://host:port connects to
    /// ws://host:port/ws/bridge, https origins use wss.
    /// Example: http://127.0.0.1:8000
    #[arg(long, env = "TOOLBRIDGE_ORIGIN")]
    pub origin: Option<String>,

    /// Configuration file (defaults to the XDG config location)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Reconnect with exponential backoff when the bridge drops
    #[arg(long, default_value_t = false)]
    pub reconnect: bool,

    /// Verbose logging (debug level, file and line numbers)
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// Also write logs to this file in the state log directory
    #[arg(long, value_name = "NAME")]
    pub log_file: Option<String>,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging setup selected by the flags
    pub fn log_config(&self) -> LogConfig {
        let config = if self.verbose {
            LogConfig::development()
        } else {
            LogConfig::client()
        };
        match &self.log_file {
            Some(name) => config.with_file(name.clone()),
            None => config,
        }
    }

    /// Override configuration values given on the command line
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(origin) = &self.origin {
            config.origin = origin.clone();
        }
        if self.reconnect {
            config.reconnect.enabled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolbridge_utils::LogOutput;

    #[test]
    fn test_flags() {
        let args = Args::parse_from(["toolbridge", "--reconnect", "-v", "-c", "/tmp/tb.toml"]);
        assert!(args.reconnect);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/tb.toml")));
    }

    #[test]
    fn test_origin_flag() {
        let args = Args::parse_from(["toolbridge", "--origin", "https://console.example.com"]);
        assert_eq!(args.origin.as_deref(), Some("https://console.example.com"));
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::parse_from(["toolbridge", "--origin", "http://10.0.0.2:8000", "--reconnect"]);
        let mut config = BridgeConfig::default();
        args.apply(&mut config);

        assert_eq!(config.origin, "http://10.0.0.2:8000");
        assert!(config.reconnect.enabled);
    }

    #[test]
    fn test_apply_keeps_file_values() {
        let args = Args {
            origin: None,
            config: None,
            reconnect: false,
            verbose: false,
            log_file: None,
        };
        let mut config = BridgeConfig {
            origin: "http://from-file:1".into(),
            ..BridgeConfig::default()
        };
        config.reconnect.enabled = true;
        args.apply(&mut config);

        assert_eq!(config.origin, "http://from-file:1");
        assert!(config.reconnect.enabled);
    }

    #[test]
    fn test_log_config_stderr_by_default() {
        let args = Args::parse_from(["toolbridge"]);
        let config = args.log_config();
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.file_name.is_none());
    }

    #[test]
    fn test_log_file_flag() {
        let args = Args::parse_from(["toolbridge", "-v", "--log-file", "bridge.log"]);
        let config = args.log_config();
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.file_name.as_deref(), Some("bridge.log"));
        assert_eq!(config.filter, "debug");
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Args::try_parse_from(["toolbridge", "--bogus"]).is_err());
    }
}
