// handlers/protected/tasks/bulk.rs - POST /api/admin/tasks/bulk handler

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::database::models::{TaskPatch, TaskStatus};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

pub const MAX_BULK_IDS: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub action: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Delete,
    Status,
    Assign,
}

impl BulkAction {
    pub fn parse(value: &str) -> Option<BulkAction> {
        match value {
            "delete" => Some(BulkAction::Delete),
            "status" => Some(BulkAction::Status),
            "assign" => Some(BulkAction::Assign),
            _ => None,
        }
    }

    pub fn permission(&self) -> Permission {
        match self {
            BulkAction::Delete => Permission::TasksDelete,
            BulkAction::Status => Permission::TasksUpdate,
            BulkAction::Assign => Permission::TasksAssign,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkOutcome {
    pub action: BulkAction,
    pub affected: u64,
}

/**
 * POST /api/admin/tasks/bulk - Apply one action to many tasks
 *
 * Each action needs its own permission: delete -> tasks.delete,
 * status -> tasks.update, assign -> tasks.assign. The whole request is
 * a single store call filtered by tenant and `{"id": {"$in": taskIds}}`.
 *
 * Expected Input:
 * { "action": "status", "taskIds": ["t-1", "t-2"], "status": "COMPLETED" }
 *
 * Output:
 * { "success": true, "data": { "action": "status", "affected": 2 } }
 */
pub async fn tasks_bulk_post(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<BulkRequest>,
) -> ApiResult<BulkOutcome> {
    let action = BulkAction::parse(body.action.trim())
        .ok_or_else(|| ApiError::invalid_field("action", format!("Unsupported action '{}'", body.action)))?;
    ctx.require_permission(action.permission())?;
    ctx.require_tenant()?;

    if body.task_ids.is_empty() {
        return Err(ApiError::invalid_field("taskIds", "At least one task id is required"));
    }
    if body.task_ids.len() > MAX_BULK_IDS {
        return Err(ApiError::invalid_field(
            "taskIds",
            format!("At most {} task ids per request", MAX_BULK_IDS),
        ));
    }

    let filter = ctx.scope().merge(json!({ "id": { "$in": &body.task_ids } }));
    let affected = match action {
        BulkAction::Delete => state.tasks.delete_where(&filter).await?,
        BulkAction::Status => {
            let raw = body.status.as_deref().unwrap_or_default();
            let status = TaskStatus::parse(raw)
                .ok_or_else(|| ApiError::invalid_field("status", format!("Unknown status '{}'", raw)))?;
            state.tasks.update_where(&filter, &TaskPatch::status(status)).await?.len() as u64
        }
        BulkAction::Assign => {
            let assignee = body.assignee_id.filter(|id| !id.trim().is_empty());
            state.tasks.update_where(&filter, &TaskPatch::assignee(assignee)).await?.len() as u64
        }
    };

    tracing::info!(
        request_id = %ctx.request_id,
        action = ?action,
        requested = body.task_ids.len(),
        affected,
        "Bulk task action applied"
    );
    Ok(ApiResponse::success(BulkOutcome { action, affected }))
}
