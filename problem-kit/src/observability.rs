//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Install a JSON `tracing` subscriber filtered by `service.log_level`.
///
/// An invalid filter directive falls back to `info`. If a global subscriber is already
/// installed the existing one is kept.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.as_str();

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .try_init();

    match installed {
        Ok(()) => {
            tracing::info!(
                service = %config.service.name,
                environment = %config.service.environment,
                "Tracing initialized"
            );
        }
        Err(e) => {
            tracing::debug!(error = %e, "Tracing subscriber already installed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        let config = Config::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let mut config = Config::default();
        config.service.log_level = "not=a=[directive".to_string();
        assert!(init_tracing(&config).is_ok());
    }
}
