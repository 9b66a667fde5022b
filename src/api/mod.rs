//! # HTTP API
//!
//! JSON-in/JSON-out endpoints composing the catalog client, the extractor and
//! the video cache:
//!
//! | Route | Behavior |
//! |---|---|
//! | `POST /search` | query + filters -> filtered tracks + catalog total |
//! | `POST /recommendations` | seed track id -> tracks |
//! | `POST /download` | name + artist -> direct stream URL + filename |
//! | `POST /search-suggestions` | partial query -> lightweight suggestions |
//! | `POST /prewarm-cache` | up to N (name, artist) pairs -> cache population |
//!
//! Every failure is rendered as `{"error": message}`: validation problems
//! with 400, upstream failures with 500.

pub mod error;
pub mod handlers;
pub mod models;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::cache::VideoCache;
use crate::config::Config;
use crate::sources::{MediaExtractor, MetadataSource};

/// Límites por defecto de las peticiones
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub search_default_limit: u32,
    pub suggestions_default_limit: u32,
    pub prewarm_max_tracks: usize,
}

impl From<&Config> for ApiSettings {
    fn from(config: &Config) -> Self {
        Self {
            search_default_limit: config.search_default_limit,
            suggestions_default_limit: config.suggestions_default_limit,
            prewarm_max_tracks: config.prewarm_max_tracks,
        }
    }
}

/// Estado compartido inyectado en cada handler
#[derive(Clone)]
pub struct AppState {
    pub metadata: Arc<dyn MetadataSource>,
    pub extractor: Arc<dyn MediaExtractor>,
    pub video_cache: Arc<VideoCache>,
    pub settings: Arc<ApiSettings>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/search", post(handlers::search))
        .route("/recommendations", post(handlers::recommendations))
        .route("/download", post(handlers::download))
        .route("/search-suggestions", post(handlers::search_suggestions))
        .route("/prewarm-cache", post(handlers::prewarm_cache))
        .fallback(handlers::not_found)
        .with_state(state)
}
