use std::{future::Future, io, net::Ipv4Addr};

use axum::serve;
use eyre::Result;
use tokio::{net::TcpListener, signal};

use crate::{
    config::Config,
    platform::{Platform, cache::AccessoryCache},
    server::create_router,
};

pub async fn launch(config_path: &str, port: Option<u16>) -> Result<()> {
    let config = Config::load(config_path).await?;
    tracing::info!("{config}");

    let platform = Platform::from_config(&config)?;

    let mut cache = match &config.cache.path {
        Some(path) => AccessoryCache::open(path).await?,
        None => AccessoryCache::in_memory(),
    };

    let accessories = platform.launch(&mut cache);
    cache.save().await?;

    if accessories.is_empty() {
        tracing::warn!("No devices configured, serving an empty accessory list");
    }

    let app = create_router(accessories);

    let port = port.unwrap_or(config.server.port);
    let socket = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;

    tracing::info!("Listening on http://0.0.0.0:{port}");
    serve(socket, app)
        .with_graceful_shutdown(shutdown(signal::ctrl_c()))
        .await?;

    tracing::info!("Shutting down");
    cache.save().await
}

/// Resolves once `signal` fires. If the signal can't be listened for, the
/// server keeps running instead of stopping straight away.
async fn shutdown(signal: impl Future<Output = io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
