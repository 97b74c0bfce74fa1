// handlers/elevated/memberships/backfill.rs - POST /api/admin/memberships/backfill handler

use axum::{extract::State, http::HeaderMap};
use serde::Deserialize;

use crate::jobs::{backfill_super_admin_memberships, BackfillReport};
use crate::middleware::{ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::tenant::TenantContext;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillQuery {
    #[serde(default)]
    pub dry_run: bool,
}

/**
 * POST /api/admin/memberships/backfill - Repair super admin memberships
 *
 * Every super admin must belong to at least one tenant. Users without a
 * home tenant are placed in the caller's current tenant. Requires a step-up
 * proof (`x-step-up-token` or `x-mfa-otp`) unless the tenant has not
 * enabled step-up.
 *
 * Query: ?dryRun=true reports what would change without writing.
 */
pub async fn memberships_backfill_post(
    State(state): State<AppState>,
    ctx: TenantContext,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<BackfillQuery>,
) -> ApiResult<BackfillReport> {
    let user_id = ctx.require_user()?;
    state.step_up.require(&headers, user_id, ctx.tenant_id.as_deref()).await?;

    let report =
        backfill_super_admin_memberships(state.directory.as_ref(), ctx.tenant_id.as_deref(), query.dry_run).await?;

    tracing::warn!(
        request_id = %ctx.request_id,
        user_id,
        dry_run = report.dry_run,
        created = report.created.len(),
        skipped = report.skipped.len(),
        "Super admin membership backfill"
    );
    Ok(ApiResponse::success(report))
}
