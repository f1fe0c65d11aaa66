use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, UdpSocket};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ports a bank node is allowed to listen on.
pub const PORT_RANGE: RangeInclusive<u16> = 65525..=65535;

/// Bank code used when the outbound interface cannot be determined.
pub const FALLBACK_BANK_CODE: &str = "127.0.0.1";

/// Top-level configuration for a bank node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interface address to bind.
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// IP address identifying this bank. Detected from the outbound interface if unset.
    #[serde(default)]
    pub bank_code: Option<String>,

    /// Seconds a client may stay silent before its connection is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Ledger file.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Log file, in addition to stdout.
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,

    /// Close a connection after this many unparsable lines (unlimited if unset).
    #[serde(default)]
    pub max_malformed_lines: Option<u32>,
}

fn default_port() -> u16 {
    *PORT_RANGE.start()
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    5
}

fn default_data_file() -> PathBuf {
    PathBuf::from("bank_data.json")
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("bank_node.log"))
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_host: default_bind_host(),
            bank_code: None,
            idle_timeout_secs: default_idle_timeout_secs(),
            data_file: default_data_file(),
            log_file: default_log_file(),
            max_malformed_lines: None,
        }
    }
}

impl NodeConfig {
    /// Load config from disk. Returns default if not found.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !PORT_RANGE.contains(&self.port) {
            bail!(
                "Port {} is outside the bank node range {}-{}",
                self.port,
                PORT_RANGE.start(),
                PORT_RANGE.end()
            );
        }
        if let Some(code) = &self.bank_code {
            code.parse::<Ipv4Addr>()
                .with_context(|| format!("Bank code '{code}' is not a valid IPv4 address"))?;
        }
        if self.idle_timeout_secs == 0 {
            bail!("Idle timeout must be at least one second");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// The configured bank code, or the address of the outbound interface.
    pub fn resolve_bank_code(&self) -> String {
        match &self.bank_code {
            Some(code) => code.clone(),
            None => detect_local_ip().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Could not detect local IP, using {FALLBACK_BANK_CODE}");
                FALLBACK_BANK_CODE.to_string()
            }),
        }
    }
}

/// Address of the interface used for outbound traffic. Sends no packets.
fn detect_local_ip() -> std::io::Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.port, 65525);
        assert_eq!(config.idle_timeout(), Duration::from_secs(5));
        assert_eq!(config.bind_addr(), "0.0.0.0:65525");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("banknode.toml");
        let config = NodeConfig {
            bank_code: Some("10.0.0.7".into()),
            max_malformed_lines: Some(3),
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        let loaded = NodeConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, NodeConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: NodeConfig = toml::from_str("port = 65530\n").unwrap();
        assert_eq!(config.port, 65530);
        assert_eq!(config.data_file, PathBuf::from("bank_data.json"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let port = NodeConfig {
            port: 8080,
            ..Default::default()
        };
        assert!(port.validate().is_err());

        let code = NodeConfig {
            bank_code: Some("bank.example".into()),
            ..Default::default()
        };
        assert!(code.validate().is_err());

        let timeout = NodeConfig {
            idle_timeout_secs: 0,
            ..Default::default()
        };
        assert!(timeout.validate().is_err());
    }

    #[test]
    fn test_configured_bank_code_wins() {
        let config = NodeConfig {
            bank_code: Some("10.1.1.1".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_bank_code(), "10.1.1.1");
    }
}
