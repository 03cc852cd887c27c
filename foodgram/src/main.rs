use clap::Parser;
use foodgram::{Application, Config, telemetry};
use sqlx::postgres::PgPoolOptions;

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before anything else that might build a TLS client
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let args = foodgram::config::Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!("{:?}", args);

    if let Some(path) = &args.import_ingredients {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.pool.acquire_timeout)
            .connect(&config.database_url)
            .await?;
        foodgram::migrator().run(&pool).await?;

        let (created, skipped) = foodgram::import_ingredients(path, &pool).await?;
        println!("Imported {created} ingredients ({skipped} already present).");
        pool.close().await;
        telemetry::shutdown_telemetry();
        return Ok(());
    }

    let shutdown = shutdown_signal();
    Application::new(config).await?.serve(shutdown).await
}
