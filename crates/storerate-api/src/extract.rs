//! Extractors whose rejections use the structured error body.

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ApiError;

/// `axum::Json` with rejections mapped to `400 invalid_input`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with rejections mapped to `400 invalid_input`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` with rejections mapped to `400 invalid_input`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Treats an empty query parameter as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Deserializes a body field to `Some` whenever its key is present, `null`
/// included. Use with `#[serde(default)]` so a missing key stays `None`.
pub(crate) fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
