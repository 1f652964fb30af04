use anyhow::Context;
use audix_config::AudixConfig;
use audix_db::service::AudixService;
use audix_server::{AppState, ServerSettings, audix_router};
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("audixd error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let config = match cli.config.as_deref() {
        Some(path) => AudixConfig::load_from(path)?,
        None => AudixConfig::load_with_dotenv()?,
    };

    match cli.command {
        cli::Commands::Migrate => {
            config.validate()?;
            AudixService::from_config(&config)
                .await
                .context("failed to open database")?;
            tracing::info!(database = %config.database.path, "schema up to date");
            Ok(())
        }
        cli::Commands::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(config).await
        }
    }
}

async fn serve(config: AudixConfig) -> anyhow::Result<()> {
    config.validate()?;
    let addr = config.server.bind_addr()?;
    let service = AudixService::from_config(&config)
        .await
        .context("failed to initialize audix service")?;

    let state = AppState::new(service)
        .with_auth(config.auth.clone())
        .with_settings(ServerSettings::from_config(&config));
    if !config.auth.enabled {
        tracing::warn!(user = %config.auth.dev_user, "auth disabled; all requests act as the dev user");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "audixd listening");

    axum::serve(listener, audix_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("audixd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("AUDIX_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
