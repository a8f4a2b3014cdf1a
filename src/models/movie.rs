//! Movie record and its validation rules.

use chrono::{DateTime, Datelike, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::models::validator::Validator;

/// A movie in the catalog.
///
/// `created_at` and the change `version` are internal bookkeeping; only the
/// fields clients may see are serialized.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
    pub version: i32,
}

/// Movie runtime in minutes, rendered as `"<n> mins"` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Runtime(pub i32);

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{} mins", self.0))
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let mut parts = raw.split(' ');
        let minutes = parts.next().and_then(|m| m.parse::<i32>().ok());
        match (minutes, parts.next(), parts.next()) {
            (Some(minutes), Some("mins"), None) => Ok(Runtime(minutes)),
            _ => Err(de::Error::custom("invalid runtime format")),
        }
    }
}

const FIRST_FILM_YEAR: i32 = 1888;

pub fn validate_movie(v: &mut Validator, movie: &Movie) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= 500,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(movie.year != 0, "year", "must be provided");
    v.check(
        movie.year >= FIRST_FILM_YEAR,
        "year",
        "must be greater than 1888",
    );
    v.check(
        movie.year <= Utc::now().year(),
        "year",
        "must not be in the future",
    );

    v.check(movie.runtime.0 != 0, "runtime", "must be provided");
    v.check(movie.runtime.0 > 0, "runtime", "must be a positive integer");

    v.check(!movie.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        movie.genres.len() <= 5,
        "genres",
        "must not contain more than 5 genres",
    );
    let mut deduped = movie.genres.clone();
    deduped.sort();
    deduped.dedup();
    v.check(
        deduped.len() == movie.genres.len(),
        "genres",
        "must not contain duplicate values",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Movie {
        Movie {
            id: 1,
            created_at: Utc::now(),
            title: "Casablanca".to_string(),
            year: 1942,
            runtime: Runtime(102),
            genres: vec!["drama".to_string(), "romance".to_string()],
            version: 1,
        }
    }

    #[test]
    fn runtime_serializes_with_unit() {
        let encoded = serde_json::to_string(&Runtime(102)).unwrap();
        assert_eq!(encoded, "\"102 mins\"");
    }

    #[test]
    fn runtime_deserializes_well_formed_values() {
        let decoded: Runtime = serde_json::from_str("\"102 mins\"").unwrap();
        assert_eq!(decoded, Runtime(102));
    }

    #[test]
    fn runtime_rejects_other_shapes() {
        for raw in ["\"102\"", "\"102 minutes\"", "\"abc mins\"", "102", "\"102  mins\""] {
            assert!(
                serde_json::from_str::<Runtime>(raw).is_err(),
                "expected {raw} to be rejected"
            );
        }
    }

    #[test]
    fn valid_movie_passes() {
        let mut v = Validator::new();
        validate_movie(&mut v, &sample());
        assert!(v.is_valid());
    }

    #[test]
    fn future_year_fails() {
        let mut movie = sample();
        movie.year = Utc::now().year() + 1;
        let mut v = Validator::new();
        validate_movie(&mut v, &movie);
        assert!(!v.is_valid());
    }

    #[test]
    fn duplicate_genres_fail() {
        let mut movie = sample();
        movie.genres = vec!["drama".to_string(), "drama".to_string()];
        let mut v = Validator::new();
        validate_movie(&mut v, &movie);
        assert!(!v.is_valid());
    }

    #[test]
    fn movie_serialization_hides_internals() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("created_at").is_none());
        assert_eq!(value["runtime"], "102 mins");
        assert_eq!(value["version"], 1);
    }
}
