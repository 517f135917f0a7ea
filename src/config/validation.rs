//! Configuration validation functions.

use super::Config;
use std::path::Path;

/// Validate configuration and fail on obviously broken deployments.
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    let is_prod = is_production_mode();

    if config.security.tls.enabled {
        let cert_path = config
            .security
            .tls
            .certificate_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("security.tls.certificate_path must be provided when TLS is enabled")
            })?;
        if !Path::new(cert_path).exists() {
            anyhow::bail!("TLS certificate file not found at {cert_path}");
        }

        let key_path = config
            .security
            .tls
            .private_key_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("security.tls.private_key_path must be provided when TLS is enabled")
            })?;
        if !Path::new(key_path).exists() {
            anyhow::bail!("TLS private key file not found at {key_path}");
        }
    }

    if config.registry.enabled && config.registry.keep_alive_interval_secs >= config.registry.lease_ttl_secs
    {
        anyhow::bail!(
            "registry.keep_alive_interval_secs ({}) must be smaller than registry.lease_ttl_secs ({})",
            config.registry.keep_alive_interval_secs,
            config.registry.lease_ttl_secs
        );
    }

    if config.metrics.sliding_window_buckets == 0 {
        anyhow::bail!("metrics.sliding_window_buckets must be greater than zero");
    }

    if is_prod && config.server.cors_origins == "*" {
        eprintln!(
            "\nWARNING: server.cors_origins is \"*\" in production. \
             Consider restricting it to known gateway origins.\n"
        );
    }

    Ok(())
}

/// Detect if we're running in production mode.
///
/// Checks for `ROLE_SERVER__ENVIRONMENT` or generic `PRODUCTION` / `PROD` environment variables.
pub fn is_production_mode() -> bool {
    use std::env;

    if let Ok(mode) = env::var("ROLE_SERVER__ENVIRONMENT") {
        return mode.to_lowercase() == "production" || mode.to_lowercase() == "prod";
    }

    env::var("ROLE_SERVER_PRODUCTION").is_ok()
        || env::var("PRODUCTION").is_ok()
        || env::var("PROD").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_tls_without_certificate_path() {
        let mut config = Config::default();
        config.security.tls.enabled = true;
        assert!(validate_config_security(&config).is_err());
    }

    #[test]
    fn rejects_keep_alive_not_smaller_than_lease_ttl() {
        let mut config = Config::default();
        config.registry.lease_ttl_secs = 5;
        config.registry.keep_alive_interval_secs = 5;
        assert!(validate_config_security(&config).is_err());
    }

    #[test]
    fn accepts_defaults() {
        let config = Config::default();
        assert!(validate_config_security(&config).is_ok());
    }
}
