mod config;

use aircontrol_api::{AircontrolApi, AircontrolApiServices};
use common::postgres::{
    MigrationRunner, PostgresClient, PostgresDeviceRepository, PostgresSensorReadingRepository,
};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryProviders};
use crate::config::ServiceConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry (tracing + OpenTelemetry for traces and logs)
    let telemetry_providers: Option<TelemetryProviders> =
        match init_telemetry(&config.telemetry_config()) {
            Ok(provider) => provider,
            Err(e) => {
                eprintln!("Failed to initialize telemetry: {}", e);
                std::process::exit(1);
            }
        };

    info!(
        otel_enabled = config.otel_enabled,
        otel_endpoint = %config.otel_endpoint,
        "Starting aircontrol-all-in-one service"
    );
    debug!(
        http_host = %config.http_host,
        http_port = config.http_port,
        postgres_host = %config.postgres_host,
        postgres_database = %config.postgres_database,
        "Loaded configuration"
    );

    let services = match initialize_services(&config).await {
        Ok(services) => services,
        Err(e) => {
            error!("Failed to initialize services: {:#}", e);
            shutdown_telemetry(telemetry_providers);
            std::process::exit(1);
        }
    };

    let shutdown_token = CancellationToken::new();
    tokio::spawn({
        let token = shutdown_token.clone();
        async move {
            shutdown_signal().await;
            token.cancel();
        }
    });

    let api = AircontrolApi::new(services, config.http_server_config());
    let mut server = tokio::spawn(api.run(shutdown_token.clone()));
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    let outcome = tokio::select! {
        joined = &mut server => joined,
        _ = shutdown_token.cancelled() => {
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        timeout_secs = config.shutdown_timeout_secs,
                        "HTTP server did not drain in time"
                    );
                    server.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    let exit_code = match outcome {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            error!("HTTP server failed: {:#}", e);
            1
        }
        Err(e) => {
            error!("HTTP server task panicked: {}", e);
            1
        }
    };

    info!("Running cleanup tasks...");
    shutdown_telemetry(telemetry_providers);

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

async fn initialize_services(config: &ServiceConfig) -> anyhow::Result<AircontrolApiServices> {
    info!("Initializing PostgreSQL...");
    let postgres_client = PostgresClient::from_config(&config.postgres_config())?;
    postgres_client.ping().await?;

    let applied = MigrationRunner::new(postgres_client.clone())
        .run_migrations()
        .await?;
    info!(applied, "Database migrations complete");

    Ok(AircontrolApiServices::new(
        Arc::new(PostgresDeviceRepository::new(postgres_client.clone())),
        Arc::new(PostgresSensorReadingRepository::new(postgres_client)),
    ))
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
    info!("shutdown signal received");
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("shutdown signal received");
}
