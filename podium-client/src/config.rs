//! Load config from file and environment.

use std::path::PathBuf;
use std::time::Duration;

use podium_core::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
use serde::Deserialize;

/// Client configuration. File: ~/.config/podium/config.toml or
/// /etc/podium/config.toml. Env overrides: PODIUM_SERVER_ADDR,
/// PODIUM_CONNECT_TIMEOUT_MS, PODIUM_READ_TIMEOUT_MS.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Leaderboard server address, host:port.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Bound on a connect attempt, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Per-frame read timeout on the receive loop, in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_server_addr() -> String {
    "127.0.0.1:7777".to_owned()
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}
fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Config {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let mut c = load_file().unwrap_or_default();
    if let Ok(s) = std::env::var("PODIUM_SERVER_ADDR") {
        if !s.is_empty() {
            c.server_addr = s;
        }
    }
    if let Ok(s) = std::env::var("PODIUM_CONNECT_TIMEOUT_MS") {
        if let Ok(ms) = s.parse::<u64>() {
            c.connect_timeout_ms = ms;
        }
    }
    if let Ok(s) = std::env::var("PODIUM_READ_TIMEOUT_MS") {
        if let Ok(ms) = s.parse::<u64>() {
            c.read_timeout_ms = ms;
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/podium/config.toml"));
    }
    out.push(PathBuf::from("/etc/podium/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                if let Ok(c) = toml::from_str::<Config>(&s) {
                    return Some(c);
                }
            }
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let c = Config::default();
        assert_eq!(c.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(c.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let c: Config = toml::from_str("server_addr = \"lb.example.net:9000\"").unwrap();
        assert_eq!(c.server_addr, "lb.example.net:9000");
        assert_eq!(c.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(toml::from_str::<Config>("shared_secret = \"nope\"").is_err());
    }
}
