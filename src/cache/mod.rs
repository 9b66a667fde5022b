//! # Cache Module
//!
//! In-memory cache mapping a (track, artist) pair to a resolved video page URL.
//!
//! There is a single bounded cache, owned by the application state and handed
//! to the handlers; nothing here is global. Entries never expire, they only
//! leave the cache under LRU pressure once `VIDEO_CACHE_SIZE` distinct pairs
//! are stored.
//!
//! ## Key
//!
//! `lowercase("{track} {artist}")`, so `("Song", "Artist")` and
//! `("song", "artist")` share one entry.
//!
//! ## Negative results
//!
//! "No video found" and extractor failures are never cached; the next lookup
//! queries the extractor again.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let cache = VideoCache::new(NonZeroUsize::new(100).unwrap());
//! if let Some(video) = cache.resolve("Song", "Artist", &extractor).await? {
//!     println!("{} (cached: {})", video.url, video.cached);
//! }
//! ```

pub mod video_cache;

pub use video_cache::VideoCache;

/// Default capacity, in distinct (track, artist) pairs.
pub const DEFAULT_CAPACITY: usize = 100;
