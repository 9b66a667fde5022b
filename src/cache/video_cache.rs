use lru::LruCache;
use parking_lot::Mutex;
use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::{debug, info};

use crate::sources::{MediaExtractor, SourceError};

/// URL de video resuelta y si vino del caché
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVideo {
    pub url: String,
    pub cached: bool,
}

/// Caché LRU acotado de (track, artista) -> URL canónica de video
#[derive(Debug)]
pub struct VideoCache {
    entries: Mutex<LruCache<String, String>>,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
}

impl VideoCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        info!("🗄️ Caché de videos iniciado con capacidad {}", capacity);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
        }
    }

    pub fn cache_key(track_name: &str, artist_name: &str) -> String {
        format!("{} {}", track_name, artist_name).to_lowercase()
    }

    /// Consulta sin ir al extractor
    pub fn get(&self, track_name: &str, artist_name: &str) -> Option<String> {
        let key = Self::cache_key(track_name, artist_name);
        let found = self.entries.lock().get(&key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Guarda la URL salvo que la clave ya tenga valor; retorna el valor vigente
    fn insert(&self, key: String, url: String) -> String {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            return existing.clone();
        }
        entries.put(key, url.clone());
        self.insertions.fetch_add(1, Ordering::Relaxed);
        url
    }

    /// Resuelve (track, artista) a una URL de video, consultando el extractor
    /// solo en un miss. Los resultados negativos no se guardan.
    pub async fn resolve(
        &self,
        track_name: &str,
        artist_name: &str,
        extractor: &dyn MediaExtractor,
    ) -> Result<Option<ResolvedVideo>, SourceError> {
        if let Some(url) = self.get(track_name, artist_name) {
            debug!("✅ Cache hit: {} - {}", track_name, artist_name);
            return Ok(Some(ResolvedVideo { url, cached: true }));
        }

        debug!("❌ Cache miss: {} - {}", track_name, artist_name);
        let query = format!("{} {}", track_name, artist_name);
        let found = extractor.search_first(&query).await?;
        let Some((url, title)) =
            found.and_then(|entry| Some((entry.canonical_url()?, entry.title)))
        else {
            debug!("Sin video para: {}", query);
            return Ok(None);
        };

        let url = self.insert(Self::cache_key(track_name, artist_name), url);
        debug!(
            "💾 Video guardado en caché: {} -> {} ({})",
            query,
            url,
            title.as_deref().unwrap_or("sin título")
        );
        Ok(Some(ResolvedVideo { url, cached: false }))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
        }
    }
}

/// Métricas básicas del caché
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockMediaExtractor, VideoEntry};
    use mockall::predicate::eq;

    fn cache(capacity: usize) -> VideoCache {
        VideoCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn hit(id: &str) -> Option<VideoEntry> {
        Some(VideoEntry {
            id: Some(id.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let mut extractor = MockMediaExtractor::new();
        extractor
            .expect_search_first()
            .with(eq("Song Artist"))
            .times(1)
            .returning(|_| Ok(hit("abc")));

        let cache = cache(10);
        let first = cache.resolve("Song", "Artist", &extractor).await.unwrap();
        assert_eq!(
            first,
            Some(ResolvedVideo {
                url: "https://www.youtube.com/watch?v=abc".to_string(),
                cached: false,
            })
        );

        let second = cache.resolve("Song", "Artist", &extractor).await.unwrap();
        assert_eq!(second.map(|v| v.cached), Some(true));
        assert_eq!(cache.stats().insertions, 1);
    }

    #[tokio::test]
    async fn test_key_is_case_insensitive() {
        let mut extractor = MockMediaExtractor::new();
        extractor
            .expect_search_first()
            .times(1)
            .returning(|_| Ok(hit("abc")));

        let cache = cache(10);
        cache.resolve("Song", "Artist", &extractor).await.unwrap();
        let again = cache.resolve("song", "ARTIST", &extractor).await.unwrap().unwrap();
        assert!(again.cached);
        assert_eq!(again.url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(VideoCache::cache_key("Song", "Artist"), "song artist");
    }

    #[tokio::test]
    async fn test_title_alone_does_not_resolve() {
        let mut extractor = MockMediaExtractor::new();
        let mut seq = mockall::Sequence::new();
        extractor
            .expect_search_first()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(Some(VideoEntry {
                    title: Some("Song (Official Video)".to_string()),
                    ..Default::default()
                }))
            });
        extractor
            .expect_search_first()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(Some(VideoEntry {
                    title: Some("Song (Official Video)".to_string()),
                    webpage_url: Some("https://www.youtube.com/watch?v=xyz".to_string()),
                    ..Default::default()
                }))
            });

        let cache = cache(10);
        assert_eq!(cache.resolve("Song", "Artist", &extractor).await.unwrap(), None);
        let found = cache.resolve("Song", "Artist", &extractor).await.unwrap().unwrap();
        assert_eq!(found.url, "https://www.youtube.com/watch?v=xyz");
        assert!(!found.cached);
    }

    #[tokio::test]
    async fn test_negative_results_are_retried() {
        let mut extractor = MockMediaExtractor::new();
        let mut seq = mockall::Sequence::new();
        extractor
            .expect_search_first()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        extractor
            .expect_search_first()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(VideoEntry::default())));
        extractor
            .expect_search_first()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(SourceError::Resolution("boom".to_string())));
        extractor
            .expect_search_first()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(hit("late")));

        let cache = cache(10);
        assert_eq!(cache.resolve("a", "b", &extractor).await.unwrap(), None);
        assert_eq!(cache.resolve("a", "b", &extractor).await.unwrap(), None);
        assert!(cache.resolve("a", "b", &extractor).await.is_err());
        assert!(cache.is_empty());

        let found = cache.resolve("a", "b", &extractor).await.unwrap().unwrap();
        assert!(!found.cached);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_least_recently_used_pair_is_evicted() {
        let mut extractor = MockMediaExtractor::new();
        extractor
            .expect_search_first()
            .returning(|query| Ok(hit(&query.replace(' ', "-"))));

        let cache = cache(2);
        cache.resolve("one", "x", &extractor).await.unwrap();
        cache.resolve("two", "x", &extractor).await.unwrap();
        // "one" pasa a ser el más reciente
        assert!(cache.get("one", "x").is_some());
        cache.resolve("three", "x", &extractor).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get("two", "x").is_none());
        assert!(cache.get("one", "x").is_some());
        assert!(cache.get("three", "x").is_some());
    }

    #[test]
    fn test_existing_value_is_never_overwritten() {
        let cache = cache(10);
        let key = VideoCache::cache_key("Song", "Artist");
        assert_eq!(cache.insert(key.clone(), "first".to_string()), "first");
        assert_eq!(cache.insert(key, "second".to_string()), "first");
        assert_eq!(cache.get("Song", "Artist").as_deref(), Some("first"));
    }

    #[test]
    fn test_stats_hit_rate() {
        let cache = cache(3);
        assert_eq!(cache.stats().hit_rate(), 0.0);
        cache.insert(VideoCache::cache_key("a", "b"), "u".to_string());
        cache.get("a", "b");
        cache.get("c", "d");
        let stats = cache.stats();
        assert_eq!(stats.capacity, 3);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}
