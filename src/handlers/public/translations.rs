// handlers/public/translations.rs - GET /api/translations/:locale handler

use axum::extract::State;
use serde_json::Value;

use crate::error::ApiError;
use crate::i18n::BUNDLE_MAX_AGE_SECS;
use crate::middleware::{ApiPath, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::tenant::TenantContext;

/// Translation bundle for one locale. Works with or without a session.
///
/// Output: `{"success": true, "data": {"common": {"save": "Save", ...}, ...}}`
/// with `Cache-Control: public, max-age=86400`.
pub async fn translations_get(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiPath(locale): ApiPath<String>,
) -> ApiResult<Value> {
    let bundle = state.translations.bundle(&locale).ok_or_else(|| {
        tracing::debug!(request_id = %ctx.request_id, locale = %locale, "Unsupported locale requested");
        ApiError::not_found(format!("Unsupported locale '{}'", locale))
    })?;

    Ok(ApiResponse::success(bundle.clone()).cache_for(BUNDLE_MAX_AGE_SECS))
}
