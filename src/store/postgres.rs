use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::Arguments;

use super::{BookingStore, DirectoryStore, ImportJobStore, SecuritySettingsStore, StoreError, TaskStore};
use crate::database::models::{
    Booking, DirectoryUser, ImportJob, SecuritySettings, Task, TaskPatch, TenantMembership,
};
use crate::database::DatabaseManager;
use crate::filter::FilterWhere;

const TASK_COLUMNS: &str =
    "id, tenant_id, title, description, priority, status, assignee_id, due_at, created_at, updated_at";

const JOB_COLUMNS: &str = "id, tenant_id, created_by, status, csv, total_rows, processed_rows, success_count, \
     failure_count, errors, retry_count, max_retries, created_at, updated_at, expires_at";

/// sqlx-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    db: DatabaseManager,
}

impl PgStore {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }
}

/// Positional arguments for a compiled where-clause, bound in `$n` order.
fn where_arguments(params: &[Value]) -> PgArguments {
    let mut args = PgArguments::default();
    for param in params {
        match param {
            Value::Null => args.add(None::<String>),
            Value::Bool(b) => args.add(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => args.add(i),
                None => args.add(n.as_f64()),
            },
            Value::String(s) => args.add(s.as_str()),
            other => args.add(other.to_string()),
        }
    }
    args
}

/// SET clause and parameters for a patch, numbered from `$1`.
fn patch_assignments(patch: &TaskPatch) -> (Vec<String>, Vec<Value>) {
    let mut sets = Vec::new();
    let mut params = Vec::new();
    let mut push = |column: &str, cast: Option<&str>, value: Value| {
        params.push(value);
        let placeholder = match cast {
            Some(cast) => format!("${}::{}", params.len(), cast),
            None => format!("${}", params.len()),
        };
        sets.push(format!("\"{}\" = {}", column, placeholder));
    };

    if let Some(title) = &patch.title {
        push("title", None, Value::String(title.trim().to_string()));
    }
    if let Some(description) = &patch.description {
        push("description", None, description.clone().map(Value::String).unwrap_or(Value::Null));
    }
    if let Some(priority) = patch.priority {
        push("priority", Some("task_priority"), Value::String(priority.as_str().to_string()));
    }
    if let Some(status) = patch.status {
        push("status", Some("task_status"), Value::String(status.as_str().to_string()));
    }
    if let Some(assignee) = &patch.assignee_id {
        push("assignee_id", None, assignee.clone().map(Value::String).unwrap_or(Value::Null));
    }
    if let Some(due_at) = &patch.due_at {
        push(
            "due_at",
            Some("timestamptz"),
            due_at.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null),
        );
    }
    sets.push("\"updated_at\" = now()".to_string());
    (sets, params)
}

#[async_trait]
impl TaskStore for PgStore {
    async fn list(&self, filter: &Value, limit: usize) -> Result<Vec<Task>, StoreError> {
        let (where_clause, params) = FilterWhere::generate(filter, Task::COLUMNS, 0)?;
        let sql = format!(
            "SELECT {} FROM tasks WHERE {} ORDER BY created_at DESC LIMIT {}",
            TASK_COLUMNS, where_clause, limit
        );
        let tasks = sqlx::query_as_with::<_, Task, _>(&sql, where_arguments(&params))
            .fetch_all(self.db.pool())
            .await?;
        Ok(tasks)
    }

    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        let sql = format!(
            "INSERT INTO tasks ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {cols}",
            cols = TASK_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Task>(&sql)
            .bind(&task.id)
            .bind(&task.tenant_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.priority)
            .bind(task.status)
            .bind(&task.assignee_id)
            .bind(task.due_at)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::Conflict(format!("Task {} already exists", task.id))
                }
                other => other.into(),
            })?;
        Ok(inserted)
    }

    async fn update_where(&self, filter: &Value, patch: &TaskPatch) -> Result<Vec<Task>, StoreError> {
        let (sets, mut params) = patch_assignments(patch);
        let (where_clause, where_params) = FilterWhere::generate(filter, Task::COLUMNS, params.len())?;
        params.extend(where_params);

        let sql = format!(
            "UPDATE tasks SET {} WHERE {} RETURNING {}",
            sets.join(", "),
            where_clause,
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as_with::<_, Task, _>(&sql, where_arguments(&params))
            .fetch_all(self.db.pool())
            .await?;
        Ok(tasks)
    }

    async fn delete_where(&self, filter: &Value) -> Result<u64, StoreError> {
        let (where_clause, params) = FilterWhere::generate(filter, Task::COLUMNS, 0)?;
        let sql = format!("DELETE FROM tasks WHERE {}", where_clause);
        let result = sqlx::query_with(&sql, where_arguments(&params)).execute(self.db.pool()).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<DirectoryUser>, StoreError> {
        let user = sqlx::query_as::<_, DirectoryUser>(
            "SELECT id, email, name, role, mfa_secret, home_tenant_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user)
    }

    async fn find_membership(&self, user_id: &str, tenant_id: &str) -> Result<Option<TenantMembership>, StoreError> {
        let membership = sqlx::query_as::<_, TenantMembership>(
            "SELECT user_id, tenant_id, role, is_default, created_at
             FROM tenant_memberships
             WHERE user_id = $1 AND tenant_id = $2",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(membership)
    }

    async fn memberships(&self, user_id: &str) -> Result<Vec<TenantMembership>, StoreError> {
        let memberships = sqlx::query_as::<_, TenantMembership>(
            "SELECT user_id, tenant_id, role, is_default, created_at
             FROM tenant_memberships
             WHERE user_id = $1
             ORDER BY is_default DESC, created_at",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(memberships)
    }

    async fn super_admins_without_membership(&self) -> Result<Vec<DirectoryUser>, StoreError> {
        let users = sqlx::query_as::<_, DirectoryUser>(
            "SELECT u.id, u.email, u.name, u.role, u.mfa_secret, u.home_tenant_id
             FROM users u
             WHERE upper(u.role) = 'SUPER_ADMIN'
               AND NOT EXISTS (SELECT 1 FROM tenant_memberships m WHERE m.user_id = u.id)
             ORDER BY u.id",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(users)
    }

    async fn upsert_membership(&self, membership: TenantMembership) -> Result<TenantMembership, StoreError> {
        let saved = sqlx::query_as::<_, TenantMembership>(
            "INSERT INTO tenant_memberships (user_id, tenant_id, role, is_default, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, tenant_id)
             DO UPDATE SET role = EXCLUDED.role, is_default = EXCLUDED.is_default
             RETURNING user_id, tenant_id, role, is_default, created_at",
        )
        .bind(&membership.user_id)
        .bind(&membership.tenant_id)
        .bind(&membership.role)
        .bind(membership.is_default)
        .bind(membership.created_at)
        .fetch_one(self.db.pool())
        .await?;
        Ok(saved)
    }
}

#[async_trait]
impl ImportJobStore for PgStore {
    async fn enqueue(&self, job: ImportJob) -> Result<ImportJob, StoreError> {
        let sql = format!(
            "INSERT INTO import_jobs ({cols})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {cols}",
            cols = JOB_COLUMNS
        );
        let saved = sqlx::query_as::<_, ImportJob>(&sql)
            .bind(&job.id)
            .bind(&job.tenant_id)
            .bind(&job.created_by)
            .bind(job.status)
            .bind(&job.csv)
            .bind(job.total_rows)
            .bind(job.processed_rows)
            .bind(job.success_count)
            .bind(job.failure_count)
            .bind(&job.errors)
            .bind(job.retry_count)
            .bind(job.max_retries)
            .bind(job.created_at)
            .bind(job.updated_at)
            .bind(job.expires_at)
            .fetch_one(self.db.pool())
            .await?;
        Ok(saved)
    }

    async fn find(&self, tenant_id: &str, job_id: &str) -> Result<Option<ImportJob>, StoreError> {
        let sql = format!("SELECT {} FROM import_jobs WHERE id = $1 AND tenant_id = $2", JOB_COLUMNS);
        let job = sqlx::query_as::<_, ImportJob>(&sql)
            .bind(job_id)
            .bind(tenant_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(job)
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<ImportJob>, StoreError> {
        // SKIP LOCKED lets concurrent scheduler firings each take a different row
        let sql = format!(
            "UPDATE import_jobs SET status = 'PROCESSING', updated_at = $1
             WHERE id = (
                 SELECT id FROM import_jobs
                 WHERE status = 'PENDING' AND expires_at > $1
                 ORDER BY created_at
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {}",
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, ImportJob>(&sql)
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(job)
    }

    async fn save(&self, job: &ImportJob) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE import_jobs
             SET status = $2, total_rows = $3, processed_rows = $4, success_count = $5,
                 failure_count = $6, errors = $7, retry_count = $8, updated_at = now()
             WHERE id = $1",
        )
        .bind(&job.id)
        .bind(job.status)
        .bind(job.total_rows)
        .bind(job.processed_rows)
        .bind(job.success_count)
        .bind(job.failure_count)
        .bind(&job.errors)
        .bind(job.retry_count)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Import job {}", job.id)));
        }
        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM import_jobs WHERE expires_at <= $1 AND status <> 'PROCESSING'")
            .bind(now)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT id, tenant_id, client_email, scheduled_at, reminder_sent
             FROM bookings
             WHERE reminder_sent = FALSE AND scheduled_at BETWEEN $1 AND $2
             ORDER BY scheduled_at
             LIMIT $3",
        )
        .bind(from)
        .bind(until)
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;
        Ok(bookings)
    }

    async fn mark_reminded(&self, booking_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE bookings SET reminder_sent = TRUE WHERE id = $1 AND reminder_sent = FALSE")
            .bind(booking_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl SecuritySettingsStore for PgStore {
    async fn get(&self, tenant_id: &str) -> Result<SecuritySettings, StoreError> {
        let settings = sqlx::query_as::<_, SecuritySettings>(
            "SELECT tenant_id, step_up_mfa, log_admin_access FROM security_settings WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(settings.unwrap_or_else(|| SecuritySettings::defaults_for(tenant_id)))
    }

    async fn put(&self, settings: SecuritySettings) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO security_settings (tenant_id, step_up_mfa, log_admin_access)
             VALUES ($1, $2, $3)
             ON CONFLICT (tenant_id)
             DO UPDATE SET step_up_mfa = EXCLUDED.step_up_mfa, log_admin_access = EXCLUDED.log_admin_access",
        )
        .bind(&settings.tenant_id)
        .bind(settings.step_up_mfa)
        .bind(settings.log_admin_access)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{TaskPriority, TaskStatus};
    use chrono::TimeZone;

    #[test]
    fn patch_assignments_number_and_cast_parameters() {
        let patch = TaskPatch {
            title: Some(" Renamed ".into()),
            status: Some(TaskStatus::Blocked),
            priority: Some(TaskPriority::Low),
            assignee_id: Some(None),
            due_at: Some(Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap())),
            ..TaskPatch::default()
        };
        let (sets, params) = patch_assignments(&patch);
        assert_eq!(
            sets,
            vec![
                "\"title\" = $1",
                "\"priority\" = $2::task_priority",
                "\"status\" = $3::task_status",
                "\"assignee_id\" = $4",
                "\"due_at\" = $5::timestamptz",
                "\"updated_at\" = now()",
            ]
        );
        assert_eq!(params[0], Value::String("Renamed".into()));
        assert_eq!(params[3], Value::Null);
    }

    #[test]
    fn update_where_parameters_follow_patch_parameters() {
        let patch = TaskPatch {
            title: Some("Renamed".into()),
            ..TaskPatch::default()
        };
        let (_, mut params) = patch_assignments(&patch);
        let (where_clause, where_params) =
            FilterWhere::generate(&serde_json::json!({"tenantId": "t1"}), Task::COLUMNS, params.len()).unwrap();
        params.extend(where_params);

        assert_eq!(where_clause, "\"tenant_id\" = $2");
        assert_eq!(params, vec![Value::String("Renamed".into()), Value::String("t1".into())]);

        // Every JSON kind has a binding
        let mixed = vec![
            Value::Null,
            Value::Bool(true),
            serde_json::json!(3),
            serde_json::json!(1.5),
            Value::String("x".into()),
            serde_json::json!(["nested"]),
        ];
        let _ = where_arguments(&mixed);
    }

    #[test]
    fn empty_patch_only_touches_timestamp() {
        let (sets, params) = patch_assignments(&TaskPatch::default());
        assert_eq!(sets, vec!["\"updated_at\" = now()"]);
        assert!(params.is_empty());
    }
}
