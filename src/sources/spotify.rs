use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use url::Url;

use super::{MetadataSource, SourceError, Track, TrackPage};

/// Margen antes de la expiración real para renovar el token
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Paging,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    items: Vec<Option<SpotifyTrack>>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    tracks: Vec<Option<SpotifyTrack>>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: SpotifyAlbum,
    preview_url: Option<String>,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    popularity: u32,
    #[serde(default)]
    explicit: bool,
    #[serde(default)]
    external_urls: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

impl From<SpotifyTrack> for Track {
    fn from(track: SpotifyTrack) -> Self {
        Self {
            id: track.id.unwrap_or_default(),
            name: track.name,
            artist: track
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_default(),
            cover_url: track.album.images.into_iter().next().map(|i| i.url),
            album: track.album.name,
            preview_url: track.preview_url,
            duration_ms: track.duration_ms,
            popularity: track.popularity,
            explicit: track.explicit,
            external_urls: track.external_urls,
        }
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Cliente del Spotify Web API con flujo client-credentials
pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    api_base: Url,
    token_url: Url,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        api_base: Url,
        token_url: Url,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client_id,
            client_secret,
            api_base,
            token_url,
            client,
            token: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.api_base
            .join(path)
            .map_err(|e| SourceError::Api {
                status: 0,
                message: format!("invalid endpoint {}: {}", path, e),
            })
    }

    /// Token vigente, renovándolo si está por expirar
    async fn access_token(&self) -> Result<String, SourceError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        debug!("🔑 Solicitando token de Spotify");
        let response = self
            .client
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("❌ Spotify token error: {} - {}", status, error_text);
            return Err(SourceError::Auth(format!("{} - {}", status, error_text)));
        }

        let token: TokenResponse = response.json().await?;
        let access = AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        };
        let value = access.value.clone();
        *guard = Some(access);
        info!("✅ Token de Spotify renovado (expira en {}s)", token.expires_in);
        Ok(value)
    }

    async fn get_json<T>(&self, url: Url, query: &[(&str, String)]) -> Result<T, SourceError>
    where
        T: serde::de::DeserializeOwned,
    {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("❌ Spotify API error: {} - {}", status, error_text);
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn parse_search(body: SearchResponse) -> TrackPage {
        TrackPage {
            items: body.tracks.items.into_iter().flatten().map(Track::from).collect(),
            total: body.tracks.total,
        }
    }

    fn parse_recommendations(body: RecommendationsResponse) -> Vec<Track> {
        body.tracks.into_iter().flatten().map(Track::from).collect()
    }
}

#[async_trait]
impl MetadataSource for SpotifyClient {
    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<TrackPage, SourceError> {
        debug!("🔍 Búsqueda en Spotify: {}", query);
        let url = self.endpoint("search")?;
        let body: SearchResponse = self
            .get_json(
                url,
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;

        let page = Self::parse_search(body);
        info!("✅ Spotify: {} resultados (total {})", page.items.len(), page.total);
        Ok(page)
    }

    async fn recommendations(
        &self,
        seed_track_id: &str,
        limit: u32,
    ) -> Result<Vec<Track>, SourceError> {
        debug!("🎯 Recomendaciones para seed: {}", seed_track_id);
        let url = self.endpoint("recommendations")?;
        let body: RecommendationsResponse = self
            .get_json(
                url,
                &[
                    ("seed_tracks", seed_track_id.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(Self::parse_recommendations(body))
    }
}
