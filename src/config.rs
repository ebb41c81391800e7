//! Configuration management for the mirror redirector.
//!
//! The configuration is a JSON document holding the package repository layout,
//! the fallback mirror country, database settings and the geo lookup table.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{MirrorError, MirrorResult};

/// Package repository layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Repository name mapped to the architectures it is built for.
    pub repositories: BTreeMap<String, Vec<String>>,
}

/// Mirror selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorsConfig {
    /// Country used when the client address cannot be located.
    pub country: String,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in pool.
    pub max_connections: u32,
    /// Connection timeout (seconds).
    pub connection_timeout: u64,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address.
    pub bind_address: String,
    /// Server port.
    pub port: u16,
    /// Take the client address from `X-Forwarded-For` when set.
    pub trust_forwarded_for: bool,
}

/// A network range located in a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoIpRange {
    /// Network in CIDR notation.
    pub network: IpNet,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Directive name understood by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Verbose output including file and line information.
    pub debug: bool,
    /// Level for this application's targets.
    pub log_level: LogLevel,
    /// Emit JSON lines instead of human readable output.
    pub json: bool,
}

/// Site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Package repositories.
    pub packages: PackagesConfig,
    /// Mirror selection.
    pub mirrors: MirrorsConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Server configuration.
    pub server: ServerConfig,
    /// Geo lookup table.
    pub geoip: Vec<GeoIpRange>,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        let both = || vec!["i686".to_string(), "x86_64".to_string()];
        let mut repositories = BTreeMap::new();
        repositories.insert("core".to_string(), both());
        repositories.insert("extra".to_string(), both());
        repositories.insert("community".to_string(), both());
        repositories.insert("testing".to_string(), both());
        repositories.insert("multilib".to_string(), vec!["x86_64".to_string()]);
        Self { repositories }
    }
}

impl Default for MirrorsConfig {
    fn default() -> Self {
        Self {
            country: "DE".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/archportal".to_string(),
            max_connections: 10,
            connection_timeout: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            trust_forwarded_for: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: LogLevel::Info,
            json: false,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            packages: PackagesConfig::default(),
            mirrors: MirrorsConfig::default(),
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            geoip: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase())
}

impl PackagesConfig {
    /// Configured repository names, sorted.
    pub fn repository_names(&self) -> Vec<String> {
        self.repositories.keys().cloned().collect()
    }

    /// Union of all architectures across repositories, sorted and deduplicated.
    pub fn architectures(&self) -> Vec<String> {
        self.repositories
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl ServerConfig {
    /// Socket address string to listen on.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl SiteConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> MirrorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MirrorError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: SiteConfig = serde_json::from_str(&content)
            .map_err(|e| MirrorError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn to_file(&self, path: &Path) -> MirrorResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            MirrorError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate the entire configuration.
    pub fn validate(&self) -> MirrorResult<()> {
        for (name, architectures) in &self.packages.repositories {
            if name.is_empty() {
                return Err(MirrorError::Configuration(
                    "Repository name cannot be empty".to_string(),
                ));
            }
            if architectures.is_empty() {
                return Err(MirrorError::Configuration(format!(
                    "Repository '{}': at least one architecture must be specified",
                    name
                )));
            }
            if architectures.iter().any(|a| a.is_empty()) {
                return Err(MirrorError::Configuration(format!(
                    "Repository '{}': architecture name cannot be empty",
                    name
                )));
            }
        }

        if !is_country_code(&self.mirrors.country) {
            return Err(MirrorError::Configuration(format!(
                "Invalid default mirror country: '{}'",
                self.mirrors.country
            )));
        }

        if let Some(range) = self.geoip.iter().find(|r| !is_country_code(&r.country)) {
            return Err(MirrorError::Configuration(format!(
                "Invalid country '{}' for network {}",
                range.country, range.network
            )));
        }

        if self.database.max_connections == 0 {
            return Err(MirrorError::Configuration(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        Ok(())
    }
}
