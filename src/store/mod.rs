//! Persistence seams. Handlers depend on these traits only; `AppState`
//! carries either the in-memory or the Postgres implementation.
//!
//! Task operations take a where-object (see `crate::filter`), normally built
//! with `TenantScope::merge`, so every query is tenant-filtered at the call site.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::database::models::{
    Booking, DirectoryUser, ImportJob, SecuritySettings, Task, TaskPatch, TenantMembership,
};
use crate::database::DatabaseError;
use crate::filter::FilterError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    Invalid(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(DatabaseError::Sqlx(err))
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Matching tasks, newest first.
    async fn list(&self, filter: &Value, limit: usize) -> Result<Vec<Task>, StoreError>;

    async fn insert(&self, task: Task) -> Result<Task, StoreError>;

    /// Applies `patch` to every matching task and returns the updated rows.
    async fn update_where(&self, filter: &Value, patch: &TaskPatch) -> Result<Vec<Task>, StoreError>;

    /// Deletes every matching task in one operation and returns the count.
    async fn delete_where(&self, filter: &Value) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<DirectoryUser>, StoreError>;

    async fn find_membership(&self, user_id: &str, tenant_id: &str) -> Result<Option<TenantMembership>, StoreError>;

    async fn memberships(&self, user_id: &str) -> Result<Vec<TenantMembership>, StoreError>;

    /// Users whose global role is super admin and who belong to no tenant.
    async fn super_admins_without_membership(&self) -> Result<Vec<DirectoryUser>, StoreError>;

    /// Insert or update on `(user_id, tenant_id)`.
    async fn upsert_membership(&self, membership: TenantMembership) -> Result<TenantMembership, StoreError>;
}

#[async_trait]
pub trait ImportJobStore: Send + Sync {
    async fn enqueue(&self, job: ImportJob) -> Result<ImportJob, StoreError>;

    async fn find(&self, tenant_id: &str, job_id: &str) -> Result<Option<ImportJob>, StoreError>;

    /// Atomically moves the oldest pending, unexpired job to PROCESSING and
    /// returns it. Concurrent callers never receive the same job.
    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<ImportJob>, StoreError>;

    /// Persists status, counters, errors and retry count.
    async fn save(&self, job: &ImportJob) -> Result<(), StoreError>;

    /// Removes jobs past their expiry and returns how many were removed.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Unreminded bookings scheduled in `[from, until]`, earliest first.
    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Conditionally flips `reminder_sent`; false when another run already did.
    async fn mark_reminded(&self, booking_id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SecuritySettingsStore: Send + Sync {
    /// Stored settings, or the defaults when the tenant has none.
    async fn get(&self, tenant_id: &str) -> Result<SecuritySettings, StoreError>;

    async fn put(&self, settings: SecuritySettings) -> Result<(), StoreError>;
}
