//! Authorization header parsing
//!
//! Pure functions over the request headers; no store access, no side
//! effects. Bearer tokens gate user endpoints, the ApiKey scheme gates the
//! membership webhook.

use axum::http::{header, HeaderMap};

const BEARER_PREFIX: &str = "Bearer ";
const API_KEY_PREFIX: &str = "ApiKey ";

/// Extract the bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthHeaderError> {
    scheme_value(headers, BEARER_PREFIX)
}

/// Extract the static API key from the Authorization header
pub fn api_key(headers: &HeaderMap) -> Result<&str, AuthHeaderError> {
    scheme_value(headers, API_KEY_PREFIX)
}

fn scheme_value<'a>(headers: &'a HeaderMap, prefix: &str) -> Result<&'a str, AuthHeaderError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthHeaderError::Missing)?;

    let value = header.to_str().map_err(|_| AuthHeaderError::MalformedScheme)?;

    let token = value
        .strip_prefix(prefix)
        .ok_or(AuthHeaderError::MalformedScheme)?;

    if token.is_empty() {
        return Err(AuthHeaderError::Empty);
    }

    Ok(token)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthHeaderError {
    #[error("Authorization header missing")]
    Missing,
    #[error("Authorization header format must be '{{scheme}} {{credential}}'")]
    MalformedScheme,
    #[error("Authorization credential is empty")]
    Empty,
}
