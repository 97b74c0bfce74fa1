// handlers/protected/auth/whoami.rs - GET /api/auth/whoami handler

use axum::extract::State;
use serde::Serialize;

use crate::database::models::TenantMembership;
use crate::middleware::{ApiResponse, ApiResult};
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    pub context: TenantContext,
    pub permissions: Vec<Permission>,
    pub memberships: Vec<TenantMembership>,
}

/// Resolved context of the caller, the permissions it grants, and the
/// tenants the caller belongs to.
pub async fn whoami_get(State(state): State<AppState>, ctx: TenantContext) -> ApiResult<WhoAmI> {
    let user_id = ctx.require_user()?;
    let memberships = state.directory.memberships(user_id).await?;

    Ok(ApiResponse::success(WhoAmI {
        permissions: ctx.granted_permissions(),
        memberships,
        context: ctx,
    }))
}
