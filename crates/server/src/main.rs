//! larder gateway entry point.
//!
//! Boots the offline cache gateway: load configuration, open the store,
//! drive the install/activate lifecycle, then serve intercepted fetches.
//! Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use url::Url;

use larder_client::{FetchClient, FetchConfig, Fetcher};
use larder_core::manifest::resolve_target;
use larder_core::policy::same_origin;
use larder_core::{AppConfig, GenerationStore, Manifest};

mod error;
mod gateway;
mod manager;
mod status;

/// Origins the gateway may fetch from besides the upstream: every manifest
/// entry's origin plus the configured extra allowances.
fn allowed_origins(config: &AppConfig, manifest: &Manifest, upstream: &Url) -> Result<Vec<Url>> {
    let mut allowed: Vec<Url> = Vec::new();

    for target in manifest.targets() {
        if !same_origin(target, upstream) && !allowed.iter().any(|o| same_origin(o, target)) {
            allowed.push(target.clone());
        }
    }

    for origin in &config.allow_origins {
        let url = Url::parse(origin).with_context(|| format!("invalid allow_origins entry: {origin}"))?;
        if !allowed.iter().any(|o| same_origin(o, &url)) {
            allowed.push(url);
        }
    }

    Ok(allowed)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("configuration")?;
    let upstream = config.upstream_url()?;
    let listen = config.listen_addr()?;
    let manifest = Manifest::resolve(&config.manifest, &upstream)?;
    let fallback = config
        .offline_fallback
        .as_deref()
        .map(|target| resolve_target(target, &upstream))
        .transpose()?;
    let allowed = allowed_origins(&config, &manifest, &upstream)?;

    tracing::info!(
        version = config.version,
        upstream = %upstream,
        manifest_targets = manifest.len(),
        "starting larder gateway"
    );

    let store = GenerationStore::open(&config.db_path).await?;

    let fetcher: Arc<dyn Fetcher> = Arc::new(FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        max_redirects: config.max_redirects,
    })?);

    let manager = Arc::new(manager::Manager::new(
        store.clone(),
        fetcher.clone(),
        manifest,
        config.version.clone(),
    ));

    // Install and activate before binding: activation never races a fetch.
    manager.startup().await?;

    let state = gateway::GatewayState {
        manager,
        store,
        fetcher,
        upstream,
        allowed_origins: Arc::new(allowed),
        fallback,
    };

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding {listen}"))?;
    tracing::info!(addr = %listen, "gateway listening");

    axum::serve(listener, gateway::router(state).into_make_service()).await?;

    Ok(())
}
