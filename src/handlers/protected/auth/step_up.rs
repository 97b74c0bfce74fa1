// handlers/protected/auth/step_up.rs - POST /api/auth/step-up handler

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::tenant::TenantContext;

#[derive(Debug, Deserialize)]
pub struct StepUpRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpGrant {
    pub token: String,
    pub expires_in_seconds: u64,
}

/**
 * POST /api/auth/step-up - Exchange a TOTP code for a step-up token
 *
 * Mounted behind the super admin policy. The returned token goes in the
 * `x-step-up-token` header of the sensitive request that follows.
 *
 * Expected Input:
 * { "code": "123456" }
 *
 * Output:
 * { "success": true, "data": { "token": "eyJ...", "expiresInSeconds": 900 } }
 */
pub async fn step_up_post(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<StepUpRequest>,
) -> ApiResult<StepUpGrant> {
    let user_id = ctx.require_user()?;
    let token = state
        .step_up
        .issue_token(user_id, ctx.tenant_id.as_deref(), &body.code)
        .await?;

    tracing::info!(request_id = %ctx.request_id, user_id, "Issued step-up token");
    Ok(ApiResponse::success(StepUpGrant {
        token,
        expires_in_seconds: state.jwt.step_up_minutes() * 60,
    }))
}
