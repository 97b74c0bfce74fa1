// handlers/scheduled/import_jobs.rs - POST /api/cron/import-jobs handler

use axum::{extract::State, http::HeaderMap};

use crate::jobs::{process_import_jobs, ImportRunSummary};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::tenant::TenantContext;

use super::require_cron_secret;

pub async fn cron_import_jobs_post(
    State(state): State<AppState>,
    ctx: TenantContext,
    headers: HeaderMap,
) -> ApiResult<ImportRunSummary> {
    require_cron_secret(&state.config.jobs, &headers)?;

    let summary = process_import_jobs(state.tasks.as_ref(), state.imports.as_ref(), &state.config.jobs).await?;
    tracing::info!(
        request_id = %ctx.request_id,
        processed = summary.processed,
        failed = summary.failed,
        requeued = summary.requeued,
        expired_removed = summary.expired_removed,
        "Import job run finished"
    );

    Ok(ApiResponse::success(summary))
}
