#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use role_server::app::AppComponents;
use role_server::config;
use role_server::logging;
use role_server::transport::{self, AppState};

/// Role Server -- the core runtime of a sharded online-game backend.
#[derive(Parser, Debug)]
#[command(name = "role-server")]
#[command(about = "Session lifecycle, opcode dispatch, and load-aware registry publication")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config_security(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Storage backend: InMemory");
                println!("  TLS enabled: {}", cfg.security.tls.enabled);
                println!("  Registry enabled: {}", cfg.registry.enabled);
                println!("  Registry service name: {}", cfg.registry.service_name);
                println!(
                    "  Session disconnect grace (s): {}",
                    cfg.session.disconnect_grace_secs
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let cors_origins = cfg.server.cors_origins.clone();

    tracing::info!(%addr, "starting role server");

    // Gameplay opcode handlers are registered by the deployment embedding
    // this binary; none are wired here, matching the spec's Non-goals
    // around gameplay-specific logic.
    let app = Arc::new(AppComponents::new(cfg, |builder| builder));
    app.start().await?;

    let state = Arc::new(AppState {
        message_service: Arc::clone(&app.message_service),
        metrics: Arc::clone(&app.metrics),
    });
    let router = transport::create_router(&cors_origins).with_state(state);

    #[cfg(feature = "tls")]
    if app.config.security.tls.enabled {
        let tls_config = build_tls_config(&app.config.security.tls)
            .await
            .map_err(|err| anyhow::anyhow!("failed to initialize TLS configuration: {err}"))?;

        tracing::info!(%addr, "server started over HTTPS with TLS enabled");

        let shutdown_app = Arc::clone(&app);
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            shutdown_app.stop().await;
        });

        axum_server::bind_rustls(addr, tls_config)
            .serve(router.into_make_service())
            .await?;

        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %cors_origins, "server started over HTTP");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_and_drain(app))
        .await?;

    Ok(())
}

async fn shutdown_and_drain(app: Arc<AppComponents>) {
    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining background tasks");
    app.stop().await;
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(feature = "tls")]
async fn build_tls_config(
    tls: &role_server::config::TlsServerConfig,
) -> anyhow::Result<axum_server::tls_rustls::RustlsConfig> {
    let cert_path = tls
        .certificate_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("security.tls.certificate_path is required"))?;
    let key_path = tls
        .private_key_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("security.tls.private_key_path is required"))?;

    let config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
    Ok(config)
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["role-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_long() {
        let cli = Cli::try_parse_from(["role-server", "--validate-config"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_short() {
        let cli = Cli::try_parse_from(["role-server", "-c"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_print_config() {
        let cli = Cli::try_parse_from(["role-server", "--print-config"]).unwrap();
        assert!(!cli.validate_config);
        assert!(cli.print_config);
    }

    #[test]
    fn test_cli_validate_and_print_config_conflict() {
        let result = Cli::try_parse_from(["role-server", "--validate-config", "--print-config"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot be used with"));
    }

    #[test]
    fn test_cli_help_contains_flags() {
        let result = Cli::try_parse_from(["role-server", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        let help_text = err.to_string();
        assert!(help_text.contains("--validate-config"));
        assert!(help_text.contains("--print-config"));
        assert!(help_text.contains("-c"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["role-server", "--version"]);
        assert!(result.is_err());
    }
}
