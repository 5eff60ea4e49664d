//! Request extractors whose rejections are reported as [`AppError`], so that a
//! malformed body, path or query string gets the same `{"error": ...}` shape
//! as every other failure.

use axum::extract::{FromRequest, FromRequestParts};

use super::errors::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
