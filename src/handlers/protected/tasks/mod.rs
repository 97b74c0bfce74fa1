// handlers/protected/tasks/mod.rs - Task administration (/api/admin/tasks/*)
//
// Every handler takes the TenantContext, checks the permission the
// operation needs, and builds store filters with `ctx.scope().merge(..)` so
// no query leaves the caller's tenant.

pub mod bulk;
pub mod create;
pub mod delete;
pub mod export;
pub mod import;
pub mod list;
pub mod update;

pub use bulk::tasks_bulk_post;
pub use create::task_create;
pub use delete::task_delete;
pub use export::tasks_export_get;
pub use import::{task_import_get, tasks_import_post};
pub use list::tasks_list;
pub use update::task_update;

use crate::error::ApiError;

pub const MAX_TITLE_CHARS: usize = 200;

fn validate_title(title: &str) -> Result<(), ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field("title", "Title is required"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::invalid_field("title", "Title must be at most 200 characters"));
    }
    Ok(())
}
