use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{error, info};

mod api;
mod cache;
mod config;
mod filters;
mod sources;

use crate::api::{ApiSettings, AppState};
use crate::cache::VideoCache;
use crate::config::Config;
use crate::sources::{SpotifyClient, YtDlpClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tunelink=debug".parse()?)
                .add_directive("axum=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando tunelink v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;

    let extractor = YtDlpClient::new(config.ytdlp_path.clone(), config.ytdlp_socket_timeout);

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&extractor).await;
    }

    info!("{}", config.summary());

    let metadata = SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        config.spotify_api_url.clone(),
        config.spotify_token_url.clone(),
        config.http_timeout,
    )
    .context("building Spotify client")?;

    let capacity = NonZeroUsize::new(config.video_cache_size)
        .context("VIDEO_CACHE_SIZE must be greater than 0")?;

    let state = AppState {
        metadata: Arc::new(metadata),
        extractor: Arc::new(extractor),
        video_cache: Arc::new(VideoCache::new(capacity)),
        settings: Arc::new(ApiSettings::from(&config)),
    };

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("🚀 Servidor escuchando en http://{}", addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    info!("👋 Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Completa solo al recibir la señal; si el handler no se pudo registrar
/// nunca completa
async fn wait_for_shutdown<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("⚠️ Señal de shutdown recibida, cerrando..."),
        Err(e) => {
            error!("Error al registrar Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}

async fn health_check(extractor: &YtDlpClient) -> Result<()> {
    // Verificar dependencias críticas
    extractor
        .version()
        .await
        .context("yt-dlp no disponible")?;
    println!("OK");
    Ok(())
}
