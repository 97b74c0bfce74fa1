// handlers/protected/tasks/delete.rs - DELETE /api/admin/tasks/:id handler

use axum::extract::State;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiPath, ApiResponse, ApiResult};
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

pub async fn task_delete(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Value> {
    ctx.require_permission(Permission::TasksDelete)?;
    ctx.require_tenant()?;

    let deleted = state.tasks.delete_where(&ctx.scope().merge(json!({ "id": id }))).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Task not found"));
    }

    tracing::info!(request_id = %ctx.request_id, task_id = %id, "Task deleted");
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
