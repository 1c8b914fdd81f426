//! Console Configuration
//!
//! This module provides configuration structures for the S3 console:
//! the HTTP listener, the storage backend and logging.

use serde::{Deserialize, Serialize};

/// Main console configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the console on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Maximum accepted upload body in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

/// Which storage backend the console talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Remote S3-compatible provider, credentials from the environment
    S3,
    /// In-process store, contents lost on restart
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::S3 => write!(f, "s3"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

/// Storage provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend selection
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Region name
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible providers (MinIO, R2, ...)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Named profile from the shared credentials file
    #[serde(default)]
    pub profile: Option<String>,

    /// Use path-style bucket addressing
    #[serde(default)]
    pub path_style: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (full, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_bind_address() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_max_upload_mb() -> u64 {
    512
}

fn default_backend() -> Backend {
    Backend::S3
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "full".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            region: default_region(),
            endpoint: None,
            profile: None,
            path_style: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: ConsoleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.bind_address.is_empty() {
            return Err(crate::Error::Config("server.bind_address cannot be empty".into()));
        }

        if self.server.max_upload_mb == 0 {
            return Err(crate::Error::Config("server.max_upload_mb must be greater than 0".into()));
        }

        if self.provider.backend == Backend::S3 && self.provider.region.trim().is_empty() {
            return Err(crate::Error::Config("provider.region cannot be empty".into()));
        }

        // Without an endpoint the region must name a provider region
        if self.provider.backend == Backend::S3 && self.provider.endpoint.is_none() {
            let known = matches!(
                self.provider.region.parse::<s3::Region>(),
                Ok(region) if !matches!(region, s3::Region::Custom { .. })
            );
            if !known {
                return Err(crate::Error::Config(format!(
                    "provider.region '{}' is not a known region; set provider.endpoint for custom regions",
                    self.provider.region
                )));
            }
        }

        if let Some(endpoint) = &self.provider.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(crate::Error::Config(format!(
                    "provider.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }

        match self.logging.format.as_str() {
            "full" | "compact" => {}
            other => {
                return Err(crate::Error::Config(format!(
                    "logging.format must be 'full' or 'compact', got '{}'",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Maximum upload size in bytes
    pub fn max_upload_bytes(&self) -> usize {
        (self.server.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}
