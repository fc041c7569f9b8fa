// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub mode: Mode,
    pub server: ServerConfig,
    pub assets: AssetsConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server operating mode
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Artifacts loaded once at startup, aggressive asset caching
    Production,
    /// Artifacts hot-reloaded from the build directory, no asset caching
    Development,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            other => Err(format!(
                "invalid mode '{other}' (expected 'production' or 'development')"
            )),
        }
    }
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Build artifact and static asset locations
#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    /// Executable that runs the server bundle
    pub runner: PathBuf,
    /// Compiled server bundle
    pub bundle: PathBuf,
    /// HTML template containing the content marker
    pub template: PathBuf,
    /// Favicon file served at /favicon.ico
    pub favicon: PathBuf,
    /// Service worker script served at /service-worker.js
    pub service_worker: PathBuf,
    /// Web app manifest served at /manifest.json
    pub manifest: PathBuf,
    /// Bundler output directory served under /dist
    pub dist_dir: PathBuf,
    /// Public asset directory served under /public
    pub public_dir: PathBuf,
    /// Production Cache-Control max-age for bundled assets (seconds)
    pub cache_max_age: u32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, or json)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}
