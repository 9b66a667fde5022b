use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::filters::{RawFilters, Scalar};
use crate::sources::Track;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub filters: Option<RawFilters>,
    pub limit: Option<Scalar>,
    pub offset: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecommendationsRequest {
    pub seed_track_id: Option<String>,
    pub limit: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DownloadRequest {
    pub name: Option<String>,
    pub artist: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SuggestionsRequest {
    pub query: Option<String>,
    pub limit: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PrewarmRequest {
    pub tracks: Option<Vec<PrewarmTrack>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PrewarmTrack {
    pub name: Option<String>,
    pub artist: Option<String>,
}

/// Track tal como se expone al cliente
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackView {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub cover_url: Option<String>,
    pub preview_url: Option<String>,
    pub duration: u64,
    pub popularity: u32,
    pub explicit: bool,
    pub external_urls: HashMap<String, String>,
}

impl From<Track> for TrackView {
    fn from(track: Track) -> Self {
        Self {
            duration: track.duration_secs(),
            id: track.id,
            name: track.name,
            artist: track.artist,
            album: track.album,
            cover_url: track.cover_url,
            preview_url: track.preview_url,
            popularity: track.popularity,
            explicit: track.explicit,
            external_urls: track.external_urls,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TracksResponse {
    pub tracks: Vec<TrackView>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub download_url: String,
    pub filename: String,
    pub title: String,
    pub duration: u64,
    pub cached: bool,
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub name: String,
    pub artist: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Serialize)]
pub struct PrewarmResponse {
    pub message: String,
    pub cached_tracks: usize,
}
