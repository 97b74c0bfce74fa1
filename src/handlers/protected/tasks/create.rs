// handlers/protected/tasks/create.rs - POST /api/admin/tasks handler

use axum::extract::State;

use crate::database::models::{NewTask, Task};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

use super::validate_title;

/// Creates a task in the caller's tenant. Setting an assignee on creation
/// also needs `tasks.assign`.
pub async fn task_create(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<NewTask>,
) -> ApiResult<Task> {
    ctx.require_permission(Permission::TasksCreate)?;
    let tenant_id = ctx.require_tenant()?;
    validate_title(&body.title)?;
    if body.assignee_id.is_some() {
        ctx.require_permission(Permission::TasksAssign)?;
    }

    let task = state.tasks.insert(Task::from_new(tenant_id, body)).await?;
    tracing::info!(request_id = %ctx.request_id, task_id = %task.id, tenant_id, "Task created");

    Ok(ApiResponse::created(task))
}
