// handlers/protected/tasks/update.rs - PATCH /api/admin/tasks/:id handler

use axum::extract::State;
use serde_json::json;

use crate::database::models::{Task, TaskPatch};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

use super::validate_title;

/// Partially updates one task. A task in another tenant is reported as
/// missing, never as forbidden.
pub async fn task_update(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Task> {
    ctx.require_permission(Permission::TasksUpdate)?;
    ctx.require_tenant()?;

    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    if patch.assignee_id.is_some() {
        ctx.require_permission(Permission::TasksAssign)?;
    }

    let filter = ctx.scope().merge(json!({ "id": id }));
    let task = state
        .tasks
        .update_where(&filter, &patch)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(ApiResponse::success(task))
}
