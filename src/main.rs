mod api;
mod chat;
mod export;
mod lead;
mod markdown;
mod outbound;
mod search;
mod settings;
mod web;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    outbound::Outbound,
    settings::{Args, Settings},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let settings = Settings::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    info!(directus = %settings.directus.api_url, "Vision dashboard server");

    let outbound = Outbound::new(settings.directus, settings.webhook)?;
    if !outbound.health().await {
        warn!("Directus is not reachable at startup");
    }

    let schema = api::schema(outbound);
    web::serve(schema, settings.web.address).await;
    Ok(())
}
