use std::{fmt, sync::Arc};

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::info;

use super::errors::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The two static keys the service accepts. The read key only opens `GET`
/// routes; the admin key opens everything.
#[derive(Clone)]
pub struct ApiKeys {
    read: Arc<str>,
    admin: Arc<str>,
}

impl ApiKeys {
    pub fn new(read: &str, admin: &str) -> Self {
        Self {
            read: read.into(),
            admin: admin.into(),
        }
    }

    /// Both keys are always compared so timing does not reveal which one
    /// matched.
    pub fn allows(&self, method: &Method, key: &str) -> bool {
        let is_admin = keys_match(key, &self.admin);
        let is_read = keys_match(key, &self.read);
        match *method {
            Method::GET | Method::HEAD => is_admin | is_read,
            Method::POST | Method::PATCH | Method::PUT | Method::DELETE => is_admin,
            _ => false,
        }
    }
}

/// Constant-time for keys of equal length; only the length comparison exits
/// early.
fn keys_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    if given.len() != expected.len() {
        return false;
    }
    let diff = given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    std::hint::black_box(diff) == 0
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys").finish_non_exhaustive()
    }
}

/// Rejects requests whose `X-API-KEY` header is missing or not valid for the
/// request method.
pub async fn require_api_key(
    State(keys): State<ApiKeys>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.is_empty());

    let Some(key) = key else {
        info!(method = %req.method(), path = %req.uri().path(), "API key missing");
        return Err(AppError::Unauthorized);
    };

    if !keys.allows(req.method(), key) {
        info!(method = %req.method(), path = %req.uri().path(), "API key rejected");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> ApiKeys {
        ApiKeys::new("read-key", "admin-key")
    }

    #[test]
    fn read_key_opens_get_only() {
        let k = keys();
        assert!(k.allows(&Method::GET, "read-key"));
        assert!(!k.allows(&Method::POST, "read-key"));
        assert!(!k.allows(&Method::PATCH, "read-key"));
        assert!(!k.allows(&Method::DELETE, "read-key"));
    }

    #[test]
    fn admin_key_opens_everything() {
        let k = keys();
        for m in [Method::GET, Method::POST, Method::PATCH, Method::DELETE] {
            assert!(k.allows(&m, "admin-key"), "{m}");
        }
    }

    #[test]
    fn unknown_key_and_method_are_rejected() {
        let k = keys();
        assert!(!k.allows(&Method::GET, "nope"));
        assert!(!k.allows(&Method::OPTIONS, "admin-key"));
    }

    #[test]
    fn keys_match_requires_every_byte() {
        assert!(keys_match("admin-key", "admin-key"));
        assert!(!keys_match("admin-kez", "admin-key"));
        assert!(!keys_match("bdmin-key", "admin-key"));
        assert!(!keys_match("admin-key-2", "admin-key"));
        assert!(!keys_match("admin", "admin-key"));
        assert!(!keys_match("", "admin-key"));
    }

    #[test]
    fn key_prefix_is_rejected() {
        let k = keys();
        assert!(!k.allows(&Method::GET, "read-ke"));
        assert!(!k.allows(&Method::POST, "admin-keyy"));
    }

    #[test]
    fn debug_hides_keys() {
        let out = format!("{:?}", keys());
        assert!(!out.contains("admin-key"));
        assert!(!out.contains("read-key"));
    }
}
