//! Configuration management for the RAX file server
//!
//! Values are read once at startup. The storage quota is only the initial
//! value; it can be changed while the server runs through the quota API.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage::validation::validate_name;

/// Plain environment variables honoured for compatibility with the
/// launcher, mapped to their configuration keys
const LAUNCHER_ENV: [(&str, &str); 3] = [
    ("PORT", "port"),
    ("ROOT_DIR", "storage_root"),
    ("QUOTA_BYTES", "default_quota"),
];

/// 1024-based size units accepted for quota values, longest suffix first
const SIZE_UNITS: [(&str, u64); 5] = [
    ("TB", 1 << 40),
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("KB", 1 << 10),
    ("B", 1),
];

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address to bind the HTTP listener
    pub bind_address: String,

    /// HTTP listen port
    pub port: u16,

    // ═══ STORAGE ═══
    /// Root directory exposed over HTTP
    pub storage_root: String,

    /// Name of the upload staging directory under the root
    pub staging_dir_name: String,

    /// Age after which staged files are reaped
    pub staging_ttl_secs: u64,

    /// Period of the staging reaper
    pub reaper_interval_secs: u64,

    /// Read chunk size for downloads
    pub transfer_buffer_size: usize,

    /// Optional directory of static UI assets
    pub public_dir: Option<String>,

    // ═══ RUNTIME ═══
    /// Initial quota in bytes or as a size string (`10GB`); unset or
    /// negative means unlimited
    /// Environment: QUOTA_BYTES or RAX_FS_DEFAULT_QUOTA
    pub default_quota: Option<String>,
}

impl ServerConfig {
    /// Load configuration from defaults, an optional config.toml and the
    /// environment
    pub fn load() -> Result<Self, ConfigError> {
        let overrides: Vec<(&str, String)> = LAUNCHER_ENV
            .iter()
            .filter_map(|(var, key)| std::env::var(var).ok().map(|value| (*key, value)))
            .collect();

        Self::build(Some("config"), &overrides)
    }

    /// Layered build: defaults, file, `RAX_FS_*` environment, then `overrides`
    pub fn build(file: Option<&str>, overrides: &[(&str, String)]) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("bind_address", "0.0.0.0")?
            .set_default("port", 3000_i64)?
            .set_default("storage_root", "./storage")?
            .set_default("staging_dir_name", ".tmp")?
            .set_default("staging_ttl_secs", 24 * 60 * 60_i64)?
            .set_default("reaper_interval_secs", 6 * 60 * 60_i64)?
            .set_default("transfer_buffer_size", 64 * 1024_i64)?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("RAX_FS").try_parsing(true));

        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.storage_root.is_empty() {
            return Err(ConfigError::Message("storage_root cannot be empty".into()));
        }

        if validate_name(&self.staging_dir_name).is_err() {
            return Err(ConfigError::Message(format!(
                "staging_dir_name must be a single path segment, got {:?}",
                self.staging_dir_name
            )));
        }

        if self.reaper_interval_secs == 0 {
            return Err(ConfigError::Message(
                "reaper_interval_secs must be greater than 0".into(),
            ));
        }

        if self.transfer_buffer_size == 0 {
            return Err(ConfigError::Message(
                "transfer_buffer_size must be greater than 0".into(),
            ));
        }

        self.default_quota_bytes()?;

        Ok(())
    }

    /// Get bind address and port as socket address
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    pub fn public_dir_path(&self) -> Option<PathBuf> {
        self.public_dir
            .as_deref()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
    }

    pub fn staging_ttl(&self) -> Duration {
        Duration::from_secs(self.staging_ttl_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    /// Initial quota in bytes, `None` for unlimited
    pub fn default_quota_bytes(&self) -> Result<Option<u64>, ConfigError> {
        match self.default_quota.as_deref() {
            Some(value) => parse_size(value),
            None => Ok(None),
        }
    }
}

/// Parses a byte count such as `1048576`, `512MB` or `1.5 GB`.
///
/// Empty or negative values mean unlimited.
pub fn parse_size(value: &str) -> Result<Option<u64>, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let invalid = || ConfigError::Message(format!("Invalid size string: {value:?}"));

    let bytes = match value.parse::<f64>() {
        Ok(number) => number,
        Err(_) => {
            let upper = value.to_ascii_uppercase();
            let (suffix, unit) = SIZE_UNITS
                .iter()
                .find(|(suffix, _)| upper.ends_with(suffix))
                .ok_or_else(invalid)?;
            let number: f64 = upper[..upper.len() - suffix.len()]
                .trim()
                .parse()
                .map_err(|_| invalid())?;
            number * *unit as f64
        }
    };

    if !bytes.is_finite() {
        return Err(invalid());
    }
    if bytes < 0.0 {
        return Ok(None);
    }
    Ok(Some(bytes.floor() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::build(None, &[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.staging_dir_name, ".tmp");
        assert_eq!(config.staging_ttl(), Duration::from_secs(86400));
        assert_eq!(config.reaper_interval(), Duration::from_secs(21600));
        assert_eq!(config.default_quota_bytes().unwrap(), None);
        assert_eq!(config.public_dir_path(), None);
    }

    #[test]
    fn test_overrides() {
        let overrides = [
            ("port", "8080".to_string()),
            ("storage_root", "/srv/files".to_string()),
            ("default_quota", "10GB".to_string()),
        ];
        let config = ServerConfig::build(None, &overrides).unwrap();
        assert_eq!(config.listen_socket(), "0.0.0.0:8080");
        assert_eq!(config.storage_root_path(), PathBuf::from("/srv/files"));
        assert_eq!(config.default_quota_bytes().unwrap(), Some(10 << 30));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::build(None, &[("port", "0".to_string())]).is_err());
        assert!(ServerConfig::build(None, &[("staging_dir_name", "../x".to_string())]).is_err());
        assert!(ServerConfig::build(None, &[("default_quota", "lots".to_string())]).is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1048576").unwrap(), Some(1048576));
        assert_eq!(parse_size("512MB").unwrap(), Some(512 << 20));
        assert_eq!(parse_size("1.5 gb").unwrap(), Some(3 << 29));
        assert_eq!(parse_size("100B").unwrap(), Some(100));
        assert_eq!(parse_size("2TB").unwrap(), Some(2 << 40));
        assert_eq!(parse_size("-1").unwrap(), None);
        assert_eq!(parse_size("  ").unwrap(), None);
        assert!(parse_size("12XB").is_err());
        assert!(parse_size("GB").is_err());
    }
}
