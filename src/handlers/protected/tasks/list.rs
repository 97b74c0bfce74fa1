// handlers/protected/tasks/list.rs - GET /api/admin/tasks handler

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::database::models::{Task, TaskStatus};
use crate::error::ApiError;
use crate::export::tasks::parse_date;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult};
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub assignee_id: Option<String>,
    pub due_before: Option<String>,
    pub date_from: Option<String>,
    pub limit: Option<usize>,
}

/// Lists the tenant's tasks, newest first.
///
/// Callers holding only `tasks.read.assigned` see tasks assigned to them,
/// whatever `assigneeId` they pass.
pub async fn tasks_list(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> ApiResult<Vec<Task>> {
    ctx.require_any_permission(&[Permission::TasksReadAll, Permission::TasksReadAssigned])?;
    ctx.require_tenant()?;

    let mut predicates = build_predicates(&query)?;
    if !ctx.has_permission(Permission::TasksReadAll) {
        let user_id = ctx.require_user()?;
        predicates.insert("assigneeId".into(), Value::String(user_id.to_string()));
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let tasks = state
        .tasks
        .list(&ctx.scope().merge(Value::Object(predicates)), limit)
        .await?;

    Ok(ApiResponse::success(tasks))
}

fn build_predicates(query: &TaskListQuery) -> Result<Map<String, Value>, ApiError> {
    let mut predicates = Map::new();

    if let Some(q) = non_blank(&query.q) {
        predicates.insert("title".into(), json!({ "$ilike": format!("%{}%", escape_like(q)) }));
    }
    if let Some(raw) = non_blank(&query.status) {
        let status = TaskStatus::parse(raw)
            .ok_or_else(|| ApiError::invalid_field("status", format!("Unknown status '{}'", raw)))?;
        predicates.insert("status".into(), json!(status.as_str()));
    }
    if let Some(assignee) = non_blank(&query.assignee_id) {
        predicates.insert("assigneeId".into(), json!(assignee));
    }
    if let Some(raw) = non_blank(&query.due_before) {
        let due = parse_date(raw).ok_or_else(|| ApiError::invalid_field("dueBefore", "Expected a date"))?;
        predicates.insert("dueAt".into(), json!({ "$lte": due.to_rfc3339() }));
    }
    if let Some(raw) = non_blank(&query.date_from) {
        let from = parse_date(raw).ok_or_else(|| ApiError::invalid_field("dateFrom", "Expected a date"))?;
        predicates.insert("createdAt".into(), json!({ "$gte": from.to_rfc3339() }));
    }

    Ok(predicates)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Escapes ILIKE wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
