use anyhow::Context;
use clap::Parser;
use config::SharedConfig;
use noteserver::{Args, Reloader, Server, TokenAuthorizer, default_registry, load_config, telemetry};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let path = args.config_path();
    let cli = args.overrides();
    let config = load_config(path.as_deref(), &cli)?;
    telemetry::init(&config.log_level);
    tracing::info!(
        config = ?path.as_ref().map(|p| p.display().to_string()),
        address = %config.address,
        "Starting noteserver"
    );

    let registry = default_registry(&config)?;
    let shared = SharedConfig::new(config);
    let dispatcher = registry.compose(&shared)?;
    tracing::info!(methods = ?dispatcher.methods(), "Services composed");

    let reloader = Arc::new(Reloader::new(path, cli, shared.clone(), dispatcher.clone()));
    let reload_task = tokio::spawn(reloader.run());

    let address = shared.current().address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    let authorizer = Arc::new(TokenAuthorizer::new(shared.clone()));
    let server = Arc::new(Server::new(dispatcher, shared, authorizer));
    server.serve(listener, shutdown_signal()).await?;

    reload_task.abort();
    tracing::info!("noteserver stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
