use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tcp_http_server::{Cli, HttpServer, ServerConfig, ShutdownOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tcp_http_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from(Cli::parse());
    let address = config.address.clone();
    let server = match HttpServer::start(config).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to bind to {}: {:#}", address, e);
            std::process::exit(1);
        }
    };
    println!("Server started on {}...", server.local_addr());

    wait_for_terminate().await?;

    match server.stop().await {
        ShutdownOutcome::Graceful => println!("Server shut down gracefully"),
        ShutdownOutcome::TimedOut { in_flight } => {
            eprintln!("Timed out waiting for {} connection(s) to finish", in_flight)
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn wait_for_terminate() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_terminate() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
