use anyhow::{Context, Result};
use clap::Parser;
use recipe_catalog::{accounts, config::Config, routes, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let state = AppState::from_config(&config)
        .await
        .context("failed to initialise application state")?;

    if let Some((email, active)) = config.account_change() {
        accounts::set_active(state.users.as_ref(), email, active)
            .await
            .with_context(|| format!("failed to update account {email}"))?;
        return Ok(());
    }

    let (address, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(config.bind, async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Shutting down");
        })
        .with_context(|| format!("failed to bind {}", config.bind))?;

    log::info!("Listening on http://{address}");
    server.await;

    Ok(())
}
