//! Movie catalog handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::http::response::{json_envelope, ApiError};
use crate::http::server::AppState;
use crate::models::movie::validate_movie;
use crate::models::{Filters, Movie, Runtime, Validator};

const SORT_SAFELIST: [&str; 8] = [
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::BadRequest("invalid id parameter".to_string())),
    }
}

/// Render `version` the way the `X-Expected-Version` header is compared:
/// decimal, or the legacy base-32 rendering some clients still send.
fn format_version(version: i32, base: u32) -> String {
    match base {
        32 => {
            const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuv";
            let mut value = version as i64;
            if value == 0 {
                return "0".to_string();
            }
            let negative = value < 0;
            value = value.abs();
            let mut out = Vec::new();
            while value > 0 {
                out.push(DIGITS[(value % 32) as usize]);
                value /= 32;
            }
            if negative {
                out.push(b'-');
            }
            out.reverse();
            String::from_utf8(out).expect("base32 digits are ASCII")
        }
        _ => version.to_string(),
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ListQuery {
    title: Option<String>,
    genres: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
    sort: Option<String>,
}

fn read_int(v: &mut Validator, raw: Option<&str>, key: &str, default: i64) -> i64 {
    match raw {
        None | Some("") => default,
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                v.add_error(key, "must be an integer");
                default
            }
        },
    }
}

/// `GET /v1/movies`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let mut v = Validator::new();

    let title = query.title.unwrap_or_default();
    let genres: Vec<String> = query
        .genres
        .filter(|g| !g.is_empty())
        .map(|g| g.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let filters = Filters {
        page: read_int(&mut v, query.page.as_deref(), "page", 1),
        page_size: read_int(&mut v, query.page_size.as_deref(), "page_size", 20),
        sort: query.sort.filter(|s| !s.is_empty()).unwrap_or_else(|| "id".to_string()),
        sort_safelist: SORT_SAFELIST.to_vec(),
    };
    filters.validate(&mut v);
    if !v.is_valid() {
        return Err(ApiError::FailedValidation(v.into_errors()));
    }

    let (movies, metadata) = state.movies.list(&title, &genres, &filters).await?;
    Ok(json_envelope(
        StatusCode::OK,
        json!({ "movies": movies, "metadata": metadata }),
    ))
}

/// `GET /v1/movies/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let movie = state.movies.get(parse_id(&id)?).await?;
    Ok(json_envelope(StatusCode::OK, json!({ "movie": movie })))
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct CreateMovieInput {
    title: String,
    year: i32,
    runtime: Option<Runtime>,
    genres: Vec<String>,
}

/// `POST /v1/movies`
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateMovieInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let mut movie = Movie {
        id: 0,
        created_at: chrono::Utc::now(),
        title: input.title,
        year: input.year,
        runtime: input.runtime.unwrap_or_default(),
        genres: input.genres,
        version: 0,
    };

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    if !v.is_valid() {
        return Err(ApiError::FailedValidation(v.into_errors()));
    }

    state.movies.insert(&mut movie).await?;

    let mut response = json_envelope(StatusCode::OK, json!({ "movie": movie }));
    if let Ok(location) = header::HeaderValue::from_str(&format!("/v1/movies/{}", movie.id)) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    Ok(response)
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct UpdateMovieInput {
    title: Option<String>,
    year: Option<i32>,
    runtime: Option<Runtime>,
    genres: Option<Vec<String>>,
}

/// `PATCH /v1/movies/{id}`
///
/// Partial update; when the client sends `X-Expected-Version` the update is
/// additionally conditional on the stored version.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<UpdateMovieInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let mut movie = state.movies.get(parse_id(&id)?).await?;

    if let Some(expected) = headers
        .get("x-expected-version")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        let base = state.config.movies.version_header_base;
        if format_version(movie.version, base) != expected {
            return Err(ApiError::EditConflict);
        }
    }

    let Json(input) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    if let Some(title) = input.title {
        movie.title = title;
    }
    if let Some(year) = input.year {
        movie.year = year;
    }
    if let Some(runtime) = input.runtime {
        movie.runtime = runtime;
    }
    if let Some(genres) = input.genres {
        movie.genres = genres;
    }

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    if !v.is_valid() {
        return Err(ApiError::FailedValidation(v.into_errors()));
    }

    state.movies.update(&mut movie).await?;
    Ok(json_envelope(StatusCode::OK, json!({ "movie": movie })))
}

/// `DELETE /v1/movies/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.movies.delete(parse_id(&id)?).await?;
    Ok(json_envelope(
        StatusCode::OK,
        json!({ "message": "movie successfully deleted" }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_renders_in_both_bases() {
        assert_eq!(format_version(1, 10), "1");
        assert_eq!(format_version(1, 32), "1");
        assert_eq!(format_version(41, 10), "41");
        assert_eq!(format_version(41, 32), "19");
        assert_eq!(format_version(0, 32), "0");
        assert_eq!(format_version(1023, 32), "vv");
    }

    #[test]
    fn id_parsing_rejects_junk() {
        assert!(parse_id("7").is_ok());
        assert!(parse_id("0").is_err());
        assert!(parse_id("-3").is_err());
        assert!(parse_id("abc").is_err());
    }

    #[test]
    fn read_int_collects_errors() {
        let mut v = Validator::new();
        assert_eq!(read_int(&mut v, Some("3"), "page", 1), 3);
        assert_eq!(read_int(&mut v, None, "page", 1), 1);
        assert!(v.is_valid());
        assert_eq!(read_int(&mut v, Some("abc"), "page", 1), 1);
        assert!(!v.is_valid());
    }
}
