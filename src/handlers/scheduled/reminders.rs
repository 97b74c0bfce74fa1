// handlers/scheduled/reminders.rs - POST /api/cron/reminders handler

use axum::{extract::State, http::HeaderMap};
use chrono::Utc;

use crate::jobs::{send_due_reminders, ReminderRunSummary};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::tenant::TenantContext;

use super::require_cron_secret;

pub async fn cron_reminders_post(
    State(state): State<AppState>,
    ctx: TenantContext,
    headers: HeaderMap,
) -> ApiResult<ReminderRunSummary> {
    require_cron_secret(&state.config.jobs, &headers)?;

    let summary =
        send_due_reminders(state.bookings.as_ref(), state.notifier.clone(), &state.config.jobs, Utc::now()).await?;
    tracing::info!(
        request_id = %ctx.request_id,
        sent = summary.sent,
        failed = summary.failed,
        tenants = summary.tenants,
        "Reminder run finished"
    );

    Ok(ApiResponse::success(summary))
}
