use super::{Cli, Command};
use anyhow::{Context, Result};
use projectdesk::config::AppConfig;
use projectdesk::seed::{SeedOptions, seed};
use projectdesk::web::{AppState, build_router};
use projectdesk::{Client, QueryBuilder};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("projectdesk=debug,tower_http=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env().context("failed to load application configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }

    match cli.command() {
        Command::Serve { host, port, seed: count } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            let client = connect(&config).await?;
            if let Some(count) = count {
                seed(&client, SeedOptions { count, reset: true })
                    .await
                    .context("failed to seed projects")?;
            }
            serve(&config, &client).await
        }
        Command::Seed { count, reset } => {
            let client = connect(&config).await?;
            let report = seed(&client, SeedOptions { count, reset })
                .await
                .context("failed to seed projects")?;
            info!(removed = report.removed, inserted = report.inserted, "Seed complete");
            Ok(())
        }
    }
}

async fn connect(config: &AppConfig) -> Result<Client> {
    let connection = config.connection_config()?;
    let store = match connection.store_dir() {
        Some(dir) => format!("persistent ({})", dir.display()),
        None => "memory-only".to_string(),
    };
    let client = Client::connect_with(connection, QueryBuilder::with_page_size(config.page_size))
        .await
        .context("failed to open the project store")?;
    info!(store = %store, "Project store ready");
    Ok(client)
}

async fn serve(config: &AppConfig, client: &Client) -> Result<()> {
    let app = build_router(AppState::new(client));

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "projectdesk started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    client
        .checkpoint()
        .await
        .context("failed to write the final checkpoint")?;
    info!("projectdesk stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
