//! Command-line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5002;
const DEFAULT_DATA_FILE: &str = "data/posts.json";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "masterblog", version, about = "Blog post API backed by a JSON file")]
pub struct CliArgs {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "MASTERBLOG_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "MASTERBLOG_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// JSON file holding every post. Created on first use.
    #[arg(long, env = "MASTERBLOG_DATA_FILE", default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, env = "MASTERBLOG_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "MASTERBLOG_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub addr: SocketAddr,
    pub data_file: PathBuf,
    pub logging: LoggingSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid host `{0}`: expected an IP address")]
    InvalidHost(String),
    #[error("invalid log level `{0}`")]
    InvalidLogLevel(String),
}

impl Settings {
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let ip = IpAddr::from_str(&args.host).map_err(|_| ConfigError::InvalidHost(args.host.clone()))?;
        let level = LevelFilter::from_str(&args.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(args.log_level.clone()))?;
        let format = if args.log_json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        Ok(Self {
            addr: SocketAddr::new(ip, args.port),
            data_file: args.data_file,
            logging: LoggingSettings { level, format },
        })
    }
}
