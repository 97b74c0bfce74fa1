// handlers/protected/translations/status.rs - GET /api/admin/translations/status handler

use axum::extract::State;
use serde::Serialize;

use crate::i18n::{LanguageCoverage, DEFAULT_LOCALE};
use crate::middleware::{ApiResponse, ApiResult};
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationStatus {
    pub default_locale: &'static str,
    pub languages: Vec<LanguageCoverage>,
}

/// Per-language key coverage measured against the default locale.
pub async fn translations_status_get(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<TranslationStatus> {
    ctx.require_permission(Permission::LanguagesView)?;

    Ok(ApiResponse::success(TranslationStatus {
        default_locale: DEFAULT_LOCALE,
        languages: state.translations.coverage(),
    }))
}
