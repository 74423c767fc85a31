//! Configuration module for tine.
//!
//! Handles loading and parsing the .tinerc configuration file.

use std::fs;
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LogConfig;
use crate::probe::{DEFAULT_SSH_PASSWORD, DEFAULT_SSH_USERNAME, ProbeConfig, SshAuth};

/// Default port for the REST API server.
pub const DEFAULT_PORT: u16 = 1235;

/// Default polling interval for `watch`, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default limit on probes in flight during a polling round.
pub const DEFAULT_MAX_PARALLEL: usize = 32;

/// Default .tinerc file content with all settings documented.
const DEFAULT_TINERC: &str = r#"# Tine Configuration File
# =======================
# This file is read on startup.
# Lines starting with '#' are comments.
#
# Server
# ------
# Address and port the status API listens on.
# bind = 127.0.0.1
# port = 1235
#
# Directory of the packaged web UI. When set, files are served from it and
# unknown paths fall back to index.html.
# assets_dir = /usr/share/tine/assets

# Probes
# ------
# Timeouts in seconds. The SSH timeout applies to each of connect,
# handshake and authentication.
# http_timeout_secs = 10
# ssh_timeout_secs = 10

# SSH probe mode: password or banner
# password: complete the handshake, then offer ssh_username/ssh_password.
#           A rejected password still counts as reachable.
# banner:   stop after the handshake.
#
# WARNING: the default credential is a placeholder. Use a credential that is
# intentionally invalid for your hosts, or banner mode.
# ssh_auth = password
# ssh_username = admin
# ssh_password = test

# Polling (tine watch)
# --------------------
# poll_interval_secs = 60
# max_parallel_probes = 32

# Logging
# -------
# log_level = info
# log_retention_hours = 24
# log_enabled = true
"#;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read or created.
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the config file.
    pub config_path: PathBuf,
    /// Address the server binds to.
    pub bind: IpAddr,
    /// Port the server listens on.
    pub port: u16,
    /// Static asset directory for the web UI.
    pub assets_dir: Option<PathBuf>,
    /// Probe settings.
    pub probe: ProbeConfig,
    /// Interval between polling rounds.
    pub poll_interval: Duration,
    /// Probes in flight at once while polling.
    pub max_parallel_probes: usize,
    /// Logging configuration.
    pub log_config: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            bind: IpAddr::from([127, 0, 0, 1]),
            port: DEFAULT_PORT,
            assets_dir: None,
            probe: ProbeConfig::default(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_parallel_probes: DEFAULT_MAX_PARALLEL,
            log_config: LogConfig::default(),
        }
    }
}

impl Config {
    /// Returns the default config file path (~/.tinerc).
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tinerc")
    }

    /// Loads configuration from the default path, creating it if it doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_config_path();
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Create default config if it doesn't exist
        if !path.exists() {
            Self::create_default_config(path).map_err(io_error)?;
        }

        let content = fs::read_to_string(path).map_err(io_error)?;
        let mut config = Self {
            config_path: path.to_path_buf(),
            ..Self::default()
        };
        config.parse(&content);

        Ok(config)
    }

    /// Creates the default config file.
    fn create_default_config(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_TINERC.as_bytes())?;
        Ok(())
    }

    /// Parses the config file content.
    pub fn parse(&mut self, content: &str) {
        let mut username = None;
        let mut password = None;
        let mut banner_only = false;

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse key = value
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = strip_inline_comment(value).trim();

                match key {
                    "ssh_auth" => banner_only = value.eq_ignore_ascii_case("banner"),
                    "ssh_username" => username = Some(value.to_string()),
                    "ssh_password" => password = Some(value.to_string()),
                    _ => self.apply_setting(key, value),
                }
            }
        }

        self.probe.ssh_auth = if banner_only {
            SshAuth::BannerOnly
        } else {
            SshAuth::Password {
                username: username.unwrap_or_else(|| DEFAULT_SSH_USERNAME.to_string()),
                password: password.unwrap_or_else(|| DEFAULT_SSH_PASSWORD.to_string()),
            }
        };
    }

    /// Applies a single setting.
    fn apply_setting(&mut self, key: &str, value: &str) {
        match key {
            "bind" => {
                if let Ok(addr) = value.parse() {
                    self.bind = addr;
                }
            }
            "port" => {
                if let Ok(port) = value.parse() {
                    self.port = port;
                }
            }
            "assets_dir" | "assets" => {
                self.assets_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "http_timeout_secs" | "http_timeout" => {
                if let Some(timeout) = parse_secs(value) {
                    self.probe.http_timeout = timeout;
                }
            }
            "ssh_timeout_secs" | "ssh_timeout" => {
                if let Some(timeout) = parse_secs(value) {
                    self.probe.ssh_timeout = timeout;
                }
            }
            "poll_interval_secs" | "poll_interval" => {
                if let Some(interval) = parse_secs(value) {
                    self.poll_interval = interval;
                }
            }
            "max_parallel_probes" => {
                if let Ok(n) = value.parse::<usize>() {
                    if n > 0 {
                        self.max_parallel_probes = n;
                    }
                }
            }
            "log_level" => {
                self.log_config.level = LogConfig::parse_level(value);
            }
            "log_retention" | "log_retention_hours" => {
                self.log_config.retention_hours = LogConfig::parse_retention(value);
            }
            "log_enabled" | "logging" => {
                self.log_config.enabled = parse_bool(value);
            }
            _ => {
                tracing::debug!("Ignoring unknown config key: {}", key);
            }
        }
    }
}

/// Parses a positive whole number of seconds.
fn parse_secs(value: &str) -> Option<Duration> {
    match value.parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
    }
}

/// Cuts a trailing `# comment`. A `#` only starts a comment when it
/// follows whitespace, so values such as passwords may contain one.
fn strip_inline_comment(value: &str) -> &str {
    let mut previous = ' ';
    for (i, c) in value.char_indices() {
        if c == '#' && previous.is_whitespace() {
            return &value[..i];
        }
        previous = c;
    }
    value
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "yes" | "1" | "on")
}
