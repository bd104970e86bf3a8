//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `PROBLEM_KIT_`, nested keys separated by `__`,
//!    e.g. `PROBLEM_KIT_MIDDLEWARE__CORS_MODE=restrictive`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/problem-kit/{service_name}/config.toml
//! 4. System directory: /etc/problem-kit/{service_name}/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

const APP_NAME: &str = "problem-kit";
const ENV_PREFIX: &str = "PROBLEM_KIT_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            port: default_port(),
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }
}

/// Which parts of the middleware chain are installed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Tag requests with `X-Correlation-ID`
    #[serde(default = "default_true")]
    pub correlation_id: bool,

    /// Tag requests with `X-Request-ID`
    #[serde(default = "default_true")]
    pub request_id: bool,

    /// Report `X-Process-Time`
    #[serde(default = "default_true")]
    pub process_time: bool,

    /// Convert panics and service errors into the generic 500 problem response
    ///
    /// Turning this off removes only the outermost safety net. Handler panics are still
    /// answered by the enabled tagging middlewares. Anything failing outside them (the
    /// trace, compression or CORS layers, or a handler when all tagging middlewares are
    /// disabled) drops the connection without a response.
    #[serde(default = "default_true")]
    pub catch_unhandled: bool,

    /// Enable gzip compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS mode: permissive, restrictive or disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            correlation_id: true,
            request_id: true,
            process_time: true,
            catch_unhandled: true,
            compression: true,
            cors_mode: default_cors_mode(),
        }
    }
}

fn default_service_name() -> String {
    APP_NAME.to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

impl Config {
    /// Load configuration from all sources, using the binary name as service name
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(default_service_name);

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later merges win
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file plus environment overrides.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Candidate config files, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let config_file_path = Path::new(service_name).join("config.toml");
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(APP_NAME)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}
