use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_STATIC_DIR: &str = "apps/ingest/static";
const DEFAULT_STORE_PATH: &str = "storage/data.json";
const DEFAULT_INGEST_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_MAX_DATAGRAM_BYTES: usize = 8192;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub static_dir: PathBuf,
    pub store_path: PathBuf,
    pub ingest_addr: SocketAddr,
    pub max_datagram_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid FORMRELAY_BIND_ADDR value '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid FORMRELAY_INGEST_ADDR value '{value}': {source}")]
    InvalidIngestAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid FORMRELAY_MAX_DATAGRAM_BYTES value '{value}': {source}")]
    InvalidMaxDatagramBytes {
        value: String,
        source: std::num::ParseIntError,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr_raw = env::var("FORMRELAY_BIND_ADDR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_addr_raw,
                source,
            })?;

        let log_filter = env::var("FORMRELAY_LOG_FILTER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let static_dir = env::var("FORMRELAY_STATIC_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        // DATA_STORE is the variable name the deployment scripts already use.
        let store_path = env::var("DATA_STORE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        let ingest_addr_raw = env::var("FORMRELAY_INGEST_ADDR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INGEST_ADDR.to_string());
        let ingest_addr =
            ingest_addr_raw
                .parse()
                .map_err(|source| ConfigError::InvalidIngestAddr {
                    value: ingest_addr_raw,
                    source,
                })?;

        let max_datagram_bytes = match env::var("FORMRELAY_MAX_DATAGRAM_BYTES")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            Some(raw) => raw
                .parse()
                .map_err(|source| ConfigError::InvalidMaxDatagramBytes { value: raw, source })?,
            None => DEFAULT_MAX_DATAGRAM_BYTES,
        };

        Ok(Self {
            bind_addr,
            log_filter,
            static_dir,
            store_path,
            ingest_addr,
            max_datagram_bytes,
        })
    }

    #[cfg(test)]
    pub fn for_tests(static_dir: PathBuf, store_path: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            static_dir,
            store_path,
            ingest_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            max_datagram_bytes: DEFAULT_MAX_DATAGRAM_BYTES,
        }
    }
}
