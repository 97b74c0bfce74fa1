// handlers/protected/tasks/import.rs - CSV import job handlers
//
// POST /api/admin/tasks/import      queue a job, processed by /api/cron/import-jobs
// GET  /api/admin/tasks/import/:id  poll job status

use axum::extract::State;
use serde::Deserialize;

use crate::database::models::ImportJob;
use crate::error::ApiError;
use crate::export::parse_import;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::permissions::Permission;
use crate::state::AppState;
use crate::tenant::TenantContext;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub csv: String,
}

/// Queues an import job. Malformed CSV is rejected up front so a job only
/// ever fails on individual rows or storage errors.
pub async fn tasks_import_post(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<ImportRequest>,
) -> ApiResult<ImportJob> {
    ctx.require_permission(Permission::TasksCreate)?;
    let tenant_id = ctx.require_tenant()?;
    let user_id = ctx.require_user()?;

    if body.csv.trim().is_empty() {
        return Err(ApiError::invalid_field("csv", "CSV content is required"));
    }
    let rows = parse_import(&body.csv)?;

    let jobs = &state.config.jobs;
    let mut job = ImportJob::pending(
        tenant_id,
        user_id,
        body.csv,
        jobs.import_job_ttl_secs,
        jobs.import_max_retries,
    );
    job.total_rows = rows.len() as i32;

    let job = state.imports.enqueue(job).await?;
    tracing::info!(request_id = %ctx.request_id, job_id = %job.id, rows = job.total_rows, "Import job queued");

    Ok(ApiResponse::accepted(job))
}

pub async fn task_import_get(
    State(state): State<AppState>,
    ctx: TenantContext,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ImportJob> {
    ctx.require_permission(Permission::TasksCreate)?;
    let tenant_id = ctx.require_tenant()?;

    let job = state
        .imports
        .find(tenant_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Import job not found"))?;

    Ok(ApiResponse::success(job))
}
