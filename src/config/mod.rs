// Configuration module entry point
// Manages application configuration and shared runtime state

mod state;
mod types;

use std::net::SocketAddr;
use std::str::FromStr;

// Re-export public types
pub use state::AppState;
pub use types::{AssetsConfig, Config, LoggingConfig, Mode, PerformanceConfig, ServerConfig};

impl Config {
    /// Load configuration from the default "config.toml"
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Layering: code defaults, then the optional config file, then
    /// `RENDERD_`-prefixed environment variables, then the plain `PORT`
    /// and `RENDER_MODE` variables for parity with common deployment
    /// conventions.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("RENDERD").separator("__"))
            .set_default("mode", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("assets.runner", "node")?
            .set_default("assets.bundle", "dist/server-bundle.js")?
            .set_default("assets.template", "dist/index.html")?
            .set_default("assets.favicon", "public/logo-48.png")?
            .set_default("assets.service_worker", "dist/service-worker.js")?
            .set_default("assets.manifest", "manifest.json")?
            .set_default("assets.dist_dir", "dist")?
            .set_default("assets.public_dir", "public")?
            .set_default("assets.cache_max_age", 2_592_000)? // 30 days
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Apply the plain `PORT` and `RENDER_MODE` environment overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => crate::logger::log_warning(&format!(
                    "Ignoring invalid PORT value: '{port}'"
                )),
            }
        }

        if let Ok(mode) = std::env::var("RENDER_MODE") {
            match Mode::from_str(&mode) {
                Ok(m) => self.mode = m,
                Err(e) => crate::logger::log_warning(&format!("Ignoring RENDER_MODE: {e}")),
            }
        }
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let cfg = Config::load_from("definitely-missing-config").unwrap();
        assert_eq!(cfg.mode, Mode::Development);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.assets.runner.to_str(), Some("node"));
        assert_eq!(cfg.assets.cache_max_age, 2_592_000);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.performance.max_connections.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_from("definitely-missing-config").unwrap();
        cfg.server.host = "0.0.0.0".to_string();
        cfg.server.port = 9000;
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 9000);

        cfg.server.host = "not an address".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
