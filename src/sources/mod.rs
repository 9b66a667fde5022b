pub mod spotify;
pub mod ytdlp;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

pub use spotify::SpotifyClient;
pub use ytdlp::YtDlpClient;

/// Errores de los colaboradores externos (catálogo y extractor)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("could not run extractor: {0}")]
    Process(#[from] std::io::Error),

    #[error("extractor exited with {code:?}: {stderr}")]
    Extractor { code: Option<i32>, stderr: String },

    #[error("invalid response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Resolution(String),
}

/// Catálogo de metadata musical (búsqueda y recomendaciones)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Busca tracks; `total` es el total reportado por el catálogo
    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<TrackPage, SourceError>;

    /// Recomendaciones a partir de un seed track
    async fn recommendations(&self, seed_track_id: &str, limit: u32)
        -> Result<Vec<Track>, SourceError>;
}

/// Extractor de video/audio externo
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Primer resultado (plano) para una búsqueda. `None` si no hay resultados.
    async fn search_first(&self, query: &str) -> Result<Option<VideoEntry>, SourceError>;

    /// Resuelve una referencia (query o URL canónica) a una URL de stream directa
    async fn extract_stream(&self, reference: &str) -> Result<StreamInfo, SourceError>;
}

/// Track tal como lo entrega el catálogo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub cover_url: Option<String>,
    pub preview_url: Option<String>,
    pub duration_ms: u64,
    pub popularity: u32,
    pub explicit: bool,
    pub external_urls: HashMap<String, String>,
}

impl Track {
    /// Duración en segundos completos
    pub fn duration_secs(&self) -> u64 {
        self.duration_ms / 1000
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPage {
    pub items: Vec<Track>,
    pub total: u64,
}

/// Resultado plano de una búsqueda en el extractor
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl VideoEntry {
    /// URL canónica: `webpage_url`, luego `url`, luego construida desde el id
    pub fn canonical_url(&self) -> Option<String> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        present(&self.webpage_url)
            .or_else(|| present(&self.url))
            .map(str::to_string)
            .or_else(|| {
                present(&self.id).map(|id| format!("https://www.youtube.com/watch?v={}", id))
            })
    }
}

/// URL de stream directa (firmada, de corta vida) más metadata best-effort
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    pub url: String,
    pub title: Option<String>,
    pub duration: Option<f64>,
}
