// handlers/public/root.rs - GET / handler

use serde_json::{json, Value};

use crate::middleware::ApiResponse;

/// Service index listing the route groups and how each is protected.
pub async fn root_get() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Backoffice API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Multi-tenant back-office API with tenant-scoped authorization",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "translations": "/api/translations/:locale (public, cached)",
            "auth": "/api/auth/whoami, /api/auth/step-up (authenticated)",
            "tasks": "/api/admin/tasks[/:id|/bulk|/export|/import] (tenant permissions)",
            "admin": "/api/admin/translations/status, /api/admin/memberships/backfill",
            "cron": "/api/cron/import-jobs, /api/cron/reminders (shared secret)"
        }
    }))
}
