// handlers/scheduled/mod.rs - Scheduled-invocation handlers (shared secret)
//
// Security Level: No session; the caller proves it is the scheduler with the
// shared cron secret, sent as `x-cron-secret` or `Authorization: Bearer`
// Route Prefix: /api/cron/*
// Middleware: tenant context wrapper with `ContextPolicy::public()`

pub mod import_jobs;
pub mod reminders;

pub use import_jobs::cron_import_jobs_post;
pub use reminders::cron_reminders_post;

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::config::JobsConfig;
use crate::error::ApiError;
use crate::tenant::resolver::bearer_token;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Rejects the call unless it carries the configured secret. With no secret
/// configured every call is rejected.
pub fn require_cron_secret(config: &JobsConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = config.cron_secret.as_deref().filter(|s| !s.is_empty()) else {
        tracing::warn!("Scheduled call rejected: no cron secret configured");
        return Err(ApiError::unauthorized("Unauthorized"));
    };

    let presented = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| bearer_token(headers));

    match presented {
        Some(secret) if bool::from(secret.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        _ => Err(ApiError::unauthorized("Unauthorized")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::{header, HeaderValue};

    fn jobs(secret: Option<&str>) -> JobsConfig {
        let mut config = AppConfig::development().jobs;
        config.cron_secret = secret.map(str::to_string);
        config
    }

    #[test]
    fn accepts_header_or_bearer() {
        let config = jobs(Some("s3cret"));

        let mut headers = HeaderMap::new();
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(require_cron_secret(&config, &headers).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(require_cron_secret(&config, &headers).is_ok());
    }

    #[test]
    fn rejects_wrong_or_missing_secret() {
        let config = jobs(Some("s3cret"));
        let mut headers = HeaderMap::new();
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("s3cre"));
        assert_eq!(require_cron_secret(&config, &headers).unwrap_err().status_code(), 401);
        assert!(require_cron_secret(&config, &HeaderMap::new()).is_err());
    }

    #[test]
    fn unset_secret_rejects_everything() {
        let mut headers = HeaderMap::new();
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static(""));
        assert!(require_cron_secret(&jobs(None), &headers).is_err());
        assert!(require_cron_secret(&jobs(Some("")), &headers).is_err());
    }
}
