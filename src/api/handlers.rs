use axum::{
    extract::{rejection::JsonRejection, State},
    response::Html,
    Json,
};
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{
    error::{ApiError, ApiResult},
    models::*,
    AppState,
};
use crate::filters::{build_query, optional_int, passes_filters, FilterError, Scalar, SearchFilters};
use crate::sources::SourceError;

/// Largo mínimo (en caracteres) de una query de sugerencias
const MIN_SUGGESTION_QUERY_CHARS: usize = 2;

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>tunelink</title></head>
<body>
<h1>tunelink</h1>
<p>POST /search, /recommendations, /download, /search-suggestions, /prewarm-cache</p>
</body>
</html>
"#;

/// Entero no negativo de la petición; un valor ausente o falsy usa el default
fn request_count(value: Option<&Scalar>, field: &'static str, default: u32) -> ApiResult<u32> {
    match optional_int(value, field)? {
        None => Ok(default),
        Some(n) => u32::try_from(n).map_err(|_| {
            ApiError::from(FilterError::InvalidNumber {
                field,
                value: n.to_string(),
            })
        }),
    }
}

/// Conserva alfanuméricos, espacios, '-', '_' y '.'; recorta espacios finales
pub fn sanitize_filename(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    kept.trim_end().to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<TracksResponse>> {
    let Json(request) = payload?;
    let query = non_empty(request.query)
        .ok_or_else(|| ApiError::validation("No search query provided"))?;

    let limit = request_count(request.limit.as_ref(), "limit", state.settings.search_default_limit)?;
    let offset = request_count(request.offset.as_ref(), "offset", 0)?;
    let filters = SearchFilters::try_from(request.filters.unwrap_or_default())?;

    let search_query = build_query(&query, &filters);
    info!("🔍 Búsqueda: {}", search_query);

    let page = state
        .metadata
        .search_tracks(&search_query, limit, offset)
        .await
        .map_err(ApiError::upstream("Search failed"))?;

    let received = page.items.len();
    let tracks: Vec<TrackView> = page
        .items
        .into_iter()
        .filter(|track| passes_filters(track, &filters))
        .map(TrackView::from)
        .collect();
    debug!("Filtros: {} de {} tracks aceptados", tracks.len(), received);

    Ok(Json(TracksResponse {
        tracks,
        total: page.total,
    }))
}

pub async fn recommendations(
    State(state): State<AppState>,
    payload: Result<Json<RecommendationsRequest>, JsonRejection>,
) -> ApiResult<Json<TracksResponse>> {
    let Json(request) = payload?;
    let seed = non_empty(request.seed_track_id)
        .ok_or_else(|| ApiError::validation("No seed track provided"))?;
    let limit = request_count(request.limit.as_ref(), "limit", state.settings.search_default_limit)?;

    let tracks: Vec<TrackView> = state
        .metadata
        .recommendations(&seed, limit)
        .await
        .map_err(ApiError::upstream("Recommendations failed"))?
        .into_iter()
        .map(TrackView::from)
        .collect();

    Ok(Json(TracksResponse {
        total: tracks.len() as u64,
        tracks,
    }))
}

pub async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Json<DownloadResponse>> {
    let Json(request) = payload?;
    let (Some(name), Some(artist)) = (non_empty(request.name), non_empty(request.artist)) else {
        return Err(ApiError::validation("Track name and artist required"));
    };

    let video = state
        .video_cache
        .resolve(&name, &artist, state.extractor.as_ref())
        .await
        .map_err(ApiError::upstream("Download failed"))?
        .ok_or_else(|| {
            ApiError::upstream("Download failed")(SourceError::Resolution(
                "No video found".to_string(),
            ))
        })?;

    let stream = state
        .extractor
        .extract_stream(&video.url)
        .await
        .map_err(ApiError::upstream("Download failed"))?;

    info!(
        "🎵 Stream resuelto: {} - {} (cache: {})",
        name, artist, video.cached
    );

    Ok(Json(DownloadResponse {
        download_url: stream.url,
        filename: sanitize_filename(&format!("{} - {}.m4a", name, artist)),
        title: stream.title.filter(|t| !t.is_empty()).unwrap_or(name),
        duration: stream.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
        cached: video.cached,
    }))
}

pub async fn search_suggestions(
    State(state): State<AppState>,
    payload: Result<Json<SuggestionsRequest>, JsonRejection>,
) -> ApiResult<Json<SuggestionsResponse>> {
    let Json(request) = payload?;
    let query = request.query.unwrap_or_default();
    if query.chars().count() < MIN_SUGGESTION_QUERY_CHARS {
        return Ok(Json(SuggestionsResponse {
            suggestions: Vec::new(),
        }));
    }

    let limit = request_count(
        request.limit.as_ref(),
        "limit",
        state.settings.suggestions_default_limit,
    )?;

    let page = state
        .metadata
        .search_tracks(&query, limit, 0)
        .await
        .map_err(ApiError::upstream("Failed to get suggestions"))?;

    Ok(Json(SuggestionsResponse {
        suggestions: page
            .items
            .into_iter()
            .map(|track| Suggestion {
                name: track.name,
                artist: track.artist,
                id: track.id,
            })
            .collect(),
    }))
}

pub async fn prewarm_cache(
    State(state): State<AppState>,
    payload: Result<Json<PrewarmRequest>, JsonRejection>,
) -> ApiResult<Json<PrewarmResponse>> {
    let Json(request) = payload?;
    let tracks = request.tracks.unwrap_or_default();
    if tracks.is_empty() {
        return Err(ApiError::validation("No tracks provided"));
    }

    let pairs: Vec<(String, String)> = tracks
        .into_iter()
        .take(state.settings.prewarm_max_tracks)
        .filter_map(|track| Some((non_empty(track.name)?, non_empty(track.artist)?)))
        .collect();

    let lookups = pairs.iter().map(|(name, artist)| {
        let state = &state;
        async move {
            match state
                .video_cache
                .resolve(name, artist, state.extractor.as_ref())
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => debug!("Prewarm sin video: {} - {}", name, artist),
                Err(e) => warn!("⚠️ Prewarm falló para {} - {}: {}", name, artist, e),
            }
        }
    });
    join_all(lookups).await;

    let cached_tracks = pairs.len();
    let stats = state.video_cache.stats();
    info!(
        "🔥 Prewarm: {} tracks ({} en caché, hit rate {:.2})",
        cached_tracks,
        stats.entries,
        stats.hit_rate()
    );

    Ok(Json(PrewarmResponse {
        message: format!("Pre-warmed cache with {} tracks", cached_tracks),
        cached_tracks,
    }))
}
