use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::NodeConfig;

#[derive(Parser, Debug, Default)]
#[command(name = "banknode", about = "Bank node serving the BC/AC/AD/AW/AB/AR/BA/BN protocol")]
pub struct Cli {
    /// TOML config file; command line flags override its values
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Port to listen on (65525-65535)
    #[arg(long)]
    pub port: Option<u16>,

    /// Interface address to bind
    #[arg(long)]
    pub bind: Option<String>,

    /// Bank code (IPv4 address of this node)
    #[arg(long)]
    pub ip: Option<String>,

    /// Client idle timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Ledger file
    #[arg(long)]
    pub datafile: Option<PathBuf>,

    /// Log file
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Close connections after this many malformed lines
    #[arg(long)]
    pub max_malformed: Option<u32>,
}

impl Cli {
    /// Merge the config file (if any) with command line overrides.
    pub fn into_config(self) -> Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_host = bind;
        }
        if let Some(ip) = self.ip {
            config.bank_code = Some(ip);
        }
        if let Some(timeout) = self.timeout {
            config.idle_timeout_secs = timeout;
        }
        if let Some(datafile) = self.datafile {
            config.data_file = datafile;
        }
        if let Some(logfile) = self.logfile {
            config.log_file = Some(logfile);
        }
        if let Some(max) = self.max_malformed {
            config.max_malformed_lines = Some(max);
        }
        Ok(config)
    }
}
