//! # Search Filters
//!
//! Builds the extended catalog query from user supplied filters and decides
//! whether a catalog track satisfies the numeric/boolean bounds.
//!
//! Filters arrive as loosely typed JSON scalars (`"120"`, `120`, `true`, ...).
//! [`RawFilters`] is the wire form; [`SearchFilters`] is the validated form
//! used by [`build_query`] and [`passes_filters`]. Falsy values (`null`, `""`,
//! `0`, `false`) mean "not set".

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::sources::Track;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Invalid value for {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
}

/// JSON scalar as sent by clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i != 0,
            Scalar::Float(f) => *f != 0.0,
            Scalar::Text(s) => !s.is_empty(),
        }
    }

    /// Integer value. Floats are truncated, numeric strings are trimmed.
    pub fn to_int(&self, field: &'static str) -> Result<i64, FilterError> {
        match self {
            Scalar::Bool(b) => Ok(i64::from(*b)),
            Scalar::Int(i) => Ok(*i),
            Scalar::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            Scalar::Text(s) => s.trim().parse().map_err(|_| FilterError::InvalidNumber {
                field,
                value: s.clone(),
            }),
            Scalar::Float(f) => Err(FilterError::InvalidNumber {
                field,
                value: f.to_string(),
            }),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Parses an optional scalar the way all numeric request fields are parsed.
pub fn optional_int(value: Option<&Scalar>, field: &'static str) -> Result<Option<i64>, FilterError> {
    value
        .filter(|v| v.is_truthy())
        .map(|v| v.to_int(field))
        .transpose()
}

/// Mood mapped to an audio-feature range token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Happy,
    Sad,
    Energetic,
    Calm,
}

impl Mood {
    /// Exact, case-sensitive match. Unknown moods yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "happy" => Some(Mood::Happy),
            "sad" => Some(Mood::Sad),
            "energetic" => Some(Mood::Energetic),
            "calm" => Some(Mood::Calm),
            _ => None,
        }
    }

    pub fn query_token(self) -> &'static str {
        match self {
            Mood::Happy => "valence:0.7-1.0",
            Mood::Sad => "valence:0.0-0.3",
            Mood::Energetic => "energy:0.7-1.0",
            Mood::Calm => "energy:0.0-0.3",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFilters {
    pub genre: Option<Scalar>,
    pub year: Option<Scalar>,
    pub language: Option<Scalar>,
    pub mood: Option<Scalar>,
    pub popularity_min: Option<Scalar>,
    pub popularity_max: Option<Scalar>,
    pub duration_min: Option<Scalar>,
    pub duration_max: Option<Scalar>,
    pub explicit: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub genre: Option<String>,
    pub year: Option<String>,
    pub language: Option<String>,
    pub mood: Option<Mood>,
    pub popularity_min: Option<i64>,
    pub popularity_max: Option<i64>,
    pub duration_min: Option<i64>,
    pub duration_max: Option<i64>,
    pub explicit: bool,
}

impl TryFrom<RawFilters> for SearchFilters {
    type Error = FilterError;

    fn try_from(raw: RawFilters) -> Result<Self, Self::Error> {
        fn text(value: Option<Scalar>) -> Option<String> {
            value.filter(Scalar::is_truthy).map(|v| v.to_string())
        }

        Ok(Self {
            popularity_min: optional_int(raw.popularity_min.as_ref(), "popularityMin")?,
            popularity_max: optional_int(raw.popularity_max.as_ref(), "popularityMax")?,
            duration_min: optional_int(raw.duration_min.as_ref(), "durationMin")?,
            duration_max: optional_int(raw.duration_max.as_ref(), "durationMax")?,
            explicit: raw.explicit.as_ref().is_some_and(Scalar::is_truthy),
            mood: raw.mood.as_ref().and_then(|m| match m {
                Scalar::Text(s) => Mood::parse(s),
                _ => None,
            }),
            genre: text(raw.genre),
            year: text(raw.year),
            language: text(raw.language),
        })
    }
}

/// Appends filter tokens to the base query: genre, year, language, then mood.
///
/// Values are interpolated verbatim; the catalog API is the one that decides
/// what it tolerates.
pub fn build_query(base: &str, filters: &SearchFilters) -> String {
    let mut query = base.to_string();

    if let Some(genre) = &filters.genre {
        query.push_str(&format!(" genre:{}", genre));
    }
    if let Some(year) = &filters.year {
        query.push_str(&format!(" year:{}", year));
    }
    if let Some(language) = &filters.language {
        query.push_str(&format!(" language:{}", language));
    }
    if let Some(mood) = filters.mood {
        query.push(' ');
        query.push_str(mood.query_token());
    }

    query
}

/// `false` as soon as one configured bound is violated.
pub fn passes_filters(track: &Track, filters: &SearchFilters) -> bool {
    let popularity = i64::from(track.popularity);
    let duration = i64::try_from(track.duration_secs()).unwrap_or(i64::MAX);

    if filters.popularity_min.is_some_and(|min| popularity < min) {
        return false;
    }
    if filters.popularity_max.is_some_and(|max| popularity > max) {
        return false;
    }
    if filters.duration_min.is_some_and(|min| duration < min) {
        return false;
    }
    if filters.duration_max.is_some_and(|max| duration > max) {
        return false;
    }
    if track.explicit && !filters.explicit {
        return false;
    }

    true
}
