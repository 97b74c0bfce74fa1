// handlers/protected/tasks/export.rs - GET /api/admin/tasks/export handler

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::export::tasks_to_csv;
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

pub const EXPORT_ROW_LIMIT: usize = 10_000;

/// Streams the tenant's tasks as an RFC 4180 CSV attachment.
pub async fn tasks_export_get(State(state): State<AppState>, ctx: TenantContext) -> Result<Response, ApiError> {
    ctx.require_permission(Permission::TasksReadAll)?;
    ctx.require_tenant()?;

    let tasks = state.tasks.list(&ctx.scope().filter(), EXPORT_ROW_LIMIT).await?;
    tracing::info!(request_id = %ctx.request_id, rows = tasks.len(), "Exporting tasks");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"tasks.csv\""),
        ],
        tasks_to_csv(&tasks),
    )
        .into_response())
}
