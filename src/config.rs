use anyhow::{Context, Result};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::cache::DEFAULT_CAPACITY;

#[derive(Debug, Clone)]
pub struct Config {
    // Spotify
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_api_url: Url,
    pub spotify_token_url: Url,
    pub http_timeout: Duration,

    // Servidor
    pub host: IpAddr,
    pub port: u16,

    // Extractor
    pub ytdlp_path: PathBuf,
    pub ytdlp_socket_timeout: Duration,

    // Caché y límites
    pub video_cache_size: usize,
    pub search_default_limit: u32,
    pub suggestions_default_limit: u32,
    pub prewarm_max_tracks: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración desde una función de búsqueda de variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };
        let duration = |key: &str, default: &str| -> Result<Duration> {
            let raw = var(key, default);
            humantime::parse_duration(&raw).with_context(|| format!("invalid {}: {}", key, raw))
        };

        let config = Self {
            // Spotify (sin valores por defecto para credenciales)
            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            spotify_api_url: parse_base_url(&var("SPOTIFY_API_URL", "https://api.spotify.com/v1/"))
                .context("invalid SPOTIFY_API_URL")?,
            spotify_token_url: Url::parse(&var(
                "SPOTIFY_TOKEN_URL",
                "https://accounts.spotify.com/api/token",
            ))
            .context("invalid SPOTIFY_TOKEN_URL")?,
            http_timeout: duration("HTTP_TIMEOUT", "10s")?,

            // Servidor
            host: var("HOST", "0.0.0.0").parse().context("invalid HOST")?,
            port: var("PORT", "5000").parse().context("invalid PORT")?,

            // Extractor
            ytdlp_path: var("YTDLP_PATH", "yt-dlp").into(),
            ytdlp_socket_timeout: duration("YTDLP_SOCKET_TIMEOUT", "10s")?,

            // Caché y límites
            video_cache_size: var("VIDEO_CACHE_SIZE", &DEFAULT_CAPACITY.to_string())
                .parse()
                .context("invalid VIDEO_CACHE_SIZE")?,
            search_default_limit: var("SEARCH_DEFAULT_LIMIT", "20")
                .parse()
                .context("invalid SEARCH_DEFAULT_LIMIT")?,
            suggestions_default_limit: var("SUGGESTIONS_DEFAULT_LIMIT", "8")
                .parse()
                .context("invalid SUGGESTIONS_DEFAULT_LIMIT")?,
            prewarm_max_tracks: var("PREWARM_MAX_TRACKS", "10")
                .parse()
                .context("invalid PREWARM_MAX_TRACKS")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Spotify credentials must not be empty
    /// - Cache size and prewarm cap must be greater than 0
    /// - Timeouts must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.spotify_client_id.trim().is_empty() || self.spotify_client_secret.trim().is_empty() {
            anyhow::bail!("Spotify client credentials must be configured");
        }

        if self.video_cache_size == 0 {
            anyhow::bail!("Video cache size must be greater than 0");
        }

        if self.prewarm_max_tracks == 0 {
            anyhow::bail!("Prewarm track limit must be greater than 0");
        }

        if self.http_timeout.is_zero() {
            anyhow::bail!("HTTP timeout must be greater than 0");
        }

        if self.ytdlp_socket_timeout.is_zero() {
            anyhow::bail!("yt-dlp socket timeout must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Credentials are left out.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Server: {}:{}\n  \
            Spotify: {} (timeout {})\n  \
            yt-dlp: {} (socket timeout {})\n  \
            Cache: {} videos\n  \
            Limits: search {}, suggestions {}, prewarm {}",
            self.host,
            self.port,
            self.spotify_api_url,
            humantime::format_duration(self.http_timeout),
            self.ytdlp_path.display(),
            humantime::format_duration(self.ytdlp_socket_timeout),
            self.video_cache_size,
            self.search_default_limit,
            self.suggestions_default_limit,
            self.prewarm_max_tracks,
        )
    }
}

/// `Url::join` descarta el último segmento si la base no termina en '/'
fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{}/", raw))
    }
}

/// Default configuration values.
///
/// Credentials stay empty: they must come from the environment.
impl Default for Config {
    fn default() -> Self {
        Self {
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            spotify_api_url: Url::parse("https://api.spotify.com/v1/")
                .expect("static URL is valid"),
            spotify_token_url: Url::parse("https://accounts.spotify.com/api/token")
                .expect("static URL is valid"),
            http_timeout: Duration::from_secs(10),

            host: IpAddr::from([0, 0, 0, 0]),
            port: 5000,

            ytdlp_path: "yt-dlp".into(),
            ytdlp_socket_timeout: Duration::from_secs(10),

            video_cache_size: DEFAULT_CAPACITY,
            search_default_limit: 20,
            suggestions_default_limit: 8,
            prewarm_max_tracks: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const CREDENTIALS: [(&str, &str); 2] = [
        ("SPOTIFY_CLIENT_ID", "id"),
        ("SPOTIFY_CLIENT_SECRET", "secret"),
    ];

    #[test]
    fn test_defaults_with_credentials() {
        let config = Config::from_lookup(lookup(&CREDENTIALS)).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.video_cache_size, 100);
        assert_eq!(config.ytdlp_socket_timeout, Duration::from_secs(10));
        assert_eq!(config.search_default_limit, 20);
        assert_eq!(config.suggestions_default_limit, 8);
        assert_eq!(config.prewarm_max_tracks, 10);
        assert_eq!(config.spotify_api_url.as_str(), "https://api.spotify.com/v1/");
    }

    #[test]
    fn test_credentials_are_required() {
        let err = Config::from_lookup(lookup(&[("SPOTIFY_CLIENT_ID", "id")])).unwrap_err();
        assert!(err.to_string().contains("SPOTIFY_CLIENT_SECRET"));

        let blank = Config::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "  "),
            ("SPOTIFY_CLIENT_SECRET", "secret"),
        ]));
        assert!(blank.is_err());
    }

    #[test]
    fn test_overrides() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("PORT", "8080"),
            ("HTTP_TIMEOUT", "2s 500ms"),
            ("VIDEO_CACHE_SIZE", "7"),
            ("SPOTIFY_API_URL", "http://localhost:9000/v1"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.http_timeout, Duration::from_millis(2500));
        assert_eq!(config.video_cache_size, 7);
        assert_eq!(
            config.spotify_api_url.join("search").unwrap().as_str(),
            "http://localhost:9000/v1/search"
        );
    }

    #[test]
    fn test_rejects_invalid_values() {
        for (key, value) in [
            ("VIDEO_CACHE_SIZE", "0"),
            ("VIDEO_CACHE_SIZE", "many"),
            ("PORT", "99999"),
            ("YTDLP_SOCKET_TIMEOUT", "0s"),
            ("HTTP_TIMEOUT", "soon"),
        ] {
            let mut vars = CREDENTIALS.to_vec();
            vars.push((key, value));
            assert!(Config::from_lookup(lookup(&vars)).is_err(), "{}={}", key, value);
        }
    }

    #[test]
    fn test_summary_hides_secrets() {
        let config = Config::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "visible-id"),
            ("SPOTIFY_CLIENT_SECRET", "top-secret"),
        ]))
        .unwrap();
        let summary = config.summary();
        assert!(!summary.contains("top-secret"));
        assert!(!summary.contains("visible-id"));
        assert!(summary.contains("100 videos"));
    }
}
