use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::handlers::{elevated, protected, public, scheduled};
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use crate::tenant::{guard, ContextPolicy};

/// Full application router. Every route group sits behind the tenant context
/// wrapper with its own policy; `/` and `/health` stay outside it.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;

    Router::new()
        // Public
        .route("/", get(public::root_get))
        .route("/health", get(public::health_get))
        .merge(guard(translation_routes(), &state, ContextPolicy::public()))
        // Protected
        .merge(guard(auth_routes(), &state, ContextPolicy::authenticated()))
        .merge(guard(task_routes(), &state, ContextPolicy::authenticated()))
        .merge(guard(admin_routes(), &state, ContextPolicy::authenticated()))
        // Elevated
        .merge(guard(elevated_routes(), &state, ContextPolicy::authenticated().super_admin()))
        // Scheduled
        .merge(guard(cron_routes(), &state, ContextPolicy::public()))
        .fallback(not_found)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state))
                .layer(DefaultBodyLimit::max(max_body)),
        )
        .with_state(state)
}

fn translation_routes() -> Router<AppState> {
    Router::new().route("/api/translations/:locale", get(public::translations_get))
}

fn auth_routes() -> Router<AppState> {
    Router::new().route("/api/auth/whoami", get(protected::whoami_get))
}

fn task_routes() -> Router<AppState> {
    use protected::tasks;

    Router::new()
        .route("/api/admin/tasks", get(tasks::tasks_list).post(tasks::task_create))
        .route("/api/admin/tasks/bulk", post(tasks::tasks_bulk_post))
        .route("/api/admin/tasks/export", get(tasks::tasks_export_get))
        .route("/api/admin/tasks/import", post(tasks::tasks_import_post))
        .route("/api/admin/tasks/import/:id", get(tasks::task_import_get))
        .route("/api/admin/tasks/:id", patch(tasks::task_update).delete(tasks::task_delete))
}

fn admin_routes() -> Router<AppState> {
    Router::new().route("/api/admin/translations/status", get(protected::translations_status_get))
}

fn elevated_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/step-up", post(protected::step_up_post))
        .route("/api/admin/memberships/backfill", post(elevated::memberships_backfill_post))
}

fn cron_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cron/import-jobs", post(scheduled::cron_import_jobs_post))
        .route("/api/cron/reminders", post(scheduled::cron_reminders_post))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if state.config.is_development() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = state
        .config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn not_found() -> impl IntoResponse {
    ApiError::not_found("Route not found")
}
