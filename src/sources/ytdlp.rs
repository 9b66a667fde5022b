use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{MediaExtractor, SourceError, StreamInfo, VideoEntry};

/// Preferencia de formato: solo audio, m4a > mp4 > cualquiera
const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio[ext=mp4]/bestaudio";
/// Chunks de 10MB para streaming
const HTTP_CHUNK_SIZE: &str = "10M";

/// Cliente que invoca yt-dlp como proceso externo
#[derive(Debug, Clone)]
pub struct YtDlpClient {
    binary: PathBuf,
    socket_timeout: Duration,
}

/// Respuesta de `--dump-single-json` sobre una búsqueda
#[derive(Debug, Deserialize)]
struct SearchOutput {
    #[serde(default)]
    entries: Option<Vec<VideoEntry>>,
}

/// Respuesta de `--dump-json` sobre un video concreto
#[derive(Debug, Deserialize)]
struct StreamOutput {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

impl YtDlpClient {
    pub fn new(binary: impl Into<PathBuf>, socket_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            socket_timeout,
        }
    }

    /// Verifica que yt-dlp esté disponible y retorna su versión
    pub async fn version(&self) -> Result<String, SourceError> {
        let stdout = self.run(vec!["--version".to_string()]).await?;
        let version = stdout.trim().to_string();
        info!("✅ yt-dlp versión: {}", version);
        Ok(version)
    }

    /// Argumentos para buscar un único resultado plano
    fn search_args(query: &str) -> Vec<String> {
        [
            "--dump-single-json",
            "--flat-playlist",
            "--playlist-items",
            "1",
            "--skip-download",
            "--quiet",
            "--no-warnings",
        ]
        .into_iter()
        .map(String::from)
        .chain(std::iter::once(format!("ytsearch1:{}", query)))
        .collect()
    }

    /// Argumentos para resolver la URL de stream de audio
    fn stream_args(&self, reference: &str) -> Vec<String> {
        let socket_timeout = self.socket_timeout.as_secs().max(1).to_string();
        [
            "--dump-json",
            "--no-playlist",
            "-f",
            AUDIO_FORMAT,
            "--no-check-certificates",
            "--prefer-insecure",
            "--socket-timeout",
            socket_timeout.as_str(),
            "--retries",
            "1",
            "--fragment-retries",
            "1",
            "--http-chunk-size",
            HTTP_CHUNK_SIZE,
            "--default-search",
            "ytsearch",
            "--quiet",
            "--no-warnings",
            reference,
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn parse_search_output(stdout: &str) -> Result<Option<VideoEntry>, SourceError> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let output: SearchOutput = serde_json::from_str(trimmed)?;
        Ok(output.entries.and_then(|entries| entries.into_iter().next()))
    }

    fn parse_stream_output(stdout: &str) -> Result<StreamInfo, SourceError> {
        // Con una query de búsqueda yt-dlp imprime una línea por entrada
        let Some(line) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return Err(SourceError::Resolution("Could not get download URL".to_string()));
        };

        let output: StreamOutput = serde_json::from_str(line)?;
        match output.url.filter(|url| !url.is_empty()) {
            Some(url) => Ok(StreamInfo {
                url,
                title: output.title,
                duration: output.duration,
            }),
            None => Err(SourceError::Resolution("Could not get download URL".to_string())),
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<String, SourceError> {
        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("yt-dlp falló ({:?}): {}", output.status.code(), stderr);
            return Err(SourceError::Extractor {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaExtractor for YtDlpClient {
    async fn search_first(&self, query: &str) -> Result<Option<VideoEntry>, SourceError> {
        debug!("🔍 Búsqueda yt-dlp: {}", query);
        let stdout = self.run(Self::search_args(query)).await?;
        let entry = Self::parse_search_output(&stdout)?;
        if entry.is_none() {
            debug!("Sin resultados en yt-dlp para: {}", query);
        }
        Ok(entry)
    }

    async fn extract_stream(&self, reference: &str) -> Result<StreamInfo, SourceError> {
        debug!("🎵 Obteniendo URL de stream para: {}", reference);
        let stdout = self.run(self.stream_args(reference)).await?;
        Self::parse_stream_output(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_search_args_limit_to_one_flat_result() {
        let args = YtDlpClient::search_args("Song Artist");
        assert!(args.contains(&"--flat-playlist".to_string()));
        assert!(args.windows(2).any(|w| w == ["--playlist-items", "1"]));
        assert_eq!(args.last().map(String::as_str), Some("ytsearch1:Song Artist"));
    }

    #[test]
    fn test_stream_args_carry_transfer_options() {
        let client = YtDlpClient::new("yt-dlp", Duration::from_secs(10));
        let args = client.stream_args("https://www.youtube.com/watch?v=abc");

        assert!(args.windows(2).any(|w| w == ["-f", AUDIO_FORMAT]));
        assert!(args.windows(2).any(|w| w == ["--socket-timeout", "10"]));
        assert!(args.windows(2).any(|w| w == ["--retries", "1"]));
        assert!(args.windows(2).any(|w| w == ["--fragment-retries", "1"]));
        assert!(args.windows(2).any(|w| w == ["--http-chunk-size", "10M"]));
        assert!(args.contains(&"--no-check-certificates".to_string()));
        assert!(args.contains(&"--prefer-insecure".to_string()));
        assert_eq!(
            args.last().map(String::as_str),
            Some("https://www.youtube.com/watch?v=abc")
        );
    }

    #[test]
    fn test_parse_search_output() {
        let stdout = r#"{"_type":"playlist","entries":[{"id":"abc123","title":"Song","url":"https://www.youtube.com/watch?v=abc123"}]}"#;
        let entry = YtDlpClient::parse_search_output(stdout).unwrap().unwrap();
        assert_eq!(entry.id.as_deref(), Some("abc123"));
        assert_eq!(
            entry.canonical_url().as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );

        assert_eq!(YtDlpClient::parse_search_output(r#"{"entries":[]}"#).unwrap(), None);
        assert_eq!(YtDlpClient::parse_search_output("{}").unwrap(), None);
        assert_eq!(YtDlpClient::parse_search_output("  \n").unwrap(), None);
        assert!(YtDlpClient::parse_search_output("not json").is_err());
    }

    #[test]
    fn test_parse_stream_output() {
        let stdout = "{\"url\":\"https://rr1.example/audio\",\"title\":\"Song\",\"duration\":213.0}\n";
        let info = YtDlpClient::parse_stream_output(stdout).unwrap();
        assert_eq!(
            info,
            StreamInfo {
                url: "https://rr1.example/audio".to_string(),
                title: Some("Song".to_string()),
                duration: Some(213.0),
            }
        );

        let missing = YtDlpClient::parse_stream_output(r#"{"title":"Song"}"#);
        assert!(matches!(missing, Err(SourceError::Resolution(_))));
        assert!(matches!(
            YtDlpClient::parse_stream_output(""),
            Err(SourceError::Resolution(_))
        ));
    }

    // Todos los escenarios con proceso real van en un solo test: escribir un
    // ejecutable mientras otro hilo hace fork puede dar ETXTBSY.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_fake_ytdlp_binary() {
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        let dir = tempfile::tempdir().unwrap();

        let search = script(
            dir.path(),
            "search.sh",
            r#"printf '%s\n' '{"entries":[{"id":"xyz","title":"Found"}]}'"#,
        );
        let client = YtDlpClient::new(&search, Duration::from_secs(10));
        let entry = client.search_first("Song Artist").await.unwrap().unwrap();
        assert_eq!(
            entry.canonical_url().as_deref(),
            Some("https://www.youtube.com/watch?v=xyz")
        );

        let stream = script(
            dir.path(),
            "stream.sh",
            r#"printf '%s\n' '{"url":"https://cdn.example/a.m4a","title":"Found","duration":180}'"#,
        );
        let client = YtDlpClient::new(&stream, Duration::from_secs(10));
        let info = client.extract_stream("https://www.youtube.com/watch?v=xyz").await.unwrap();
        assert_eq!(info.url, "https://cdn.example/a.m4a");
        assert_eq!(info.duration, Some(180.0));

        let failing = script(dir.path(), "fail.sh", "echo 'ERROR: boom' >&2\nexit 1");
        let client = YtDlpClient::new(&failing, Duration::from_secs(10));
        match client.search_first("anything").await {
            Err(SourceError::Extractor { code, stderr }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "ERROR: boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let client = YtDlpClient::new(dir.path().join("missing"), Duration::from_secs(10));
        assert!(matches!(
            client.version().await,
            Err(SourceError::Process(_))
        ));
    }
}
