use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

use super::{BookingStore, DirectoryStore, ImportJobStore, SecuritySettingsStore, StoreError, TaskStore};
use crate::database::models::{
    Booking, DirectoryUser, ImportJob, ImportJobStatus, SecuritySettings, Task, TaskPatch, TenantMembership,
};
use crate::filter::FilterMatch;

/// Process-local store used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<Vec<Task>>,
    users: RwLock<HashMap<String, DirectoryUser>>,
    memberships: RwLock<Vec<TenantMembership>>,
    // Mutex, not RwLock: claiming must be a single critical section
    jobs: Mutex<Vec<ImportJob>>,
    bookings: Mutex<Vec<Booking>>,
    settings: RwLock<HashMap<String, SecuritySettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: DirectoryUser) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn insert_booking(&self, booking: Booking) {
        self.bookings.lock().await.push(booking);
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().await.clone()
    }

    fn task_matches(matcher: &FilterMatch, task: &Task) -> Result<bool, StoreError> {
        let record = serde_json::to_value(task).map_err(|e| StoreError::Invalid(e.to_string()))?;
        Ok(matcher.matches(&record))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list(&self, filter: &Value, limit: usize) -> Result<Vec<Task>, StoreError> {
        let matcher = FilterMatch::compile(filter, Task::COLUMNS)?;
        let tasks = self.tasks.read().await;
        let mut matched = Vec::new();
        for task in tasks.iter() {
            if Self::task_matches(&matcher, task)? {
                matched.push(task.clone());
            }
        }
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.iter().any(|t| t.id == task.id) {
            return Err(StoreError::Conflict(format!("Task {} already exists", task.id)));
        }
        tasks.push(task.clone());
        Ok(task)
    }

    async fn update_where(&self, filter: &Value, patch: &TaskPatch) -> Result<Vec<Task>, StoreError> {
        let matcher = FilterMatch::compile(filter, Task::COLUMNS)?;
        let mut tasks = self.tasks.write().await;
        let mut updated = Vec::new();
        for task in tasks.iter_mut() {
            if Self::task_matches(&matcher, task)? {
                task.apply(patch);
                updated.push(task.clone());
            }
        }
        Ok(updated)
    }

    async fn delete_where(&self, filter: &Value) -> Result<u64, StoreError> {
        let matcher = FilterMatch::compile(filter, Task::COLUMNS)?;
        let mut tasks = self.tasks.write().await;
        // An error must leave the store intact
        let hits = tasks
            .iter()
            .map(|task| Self::task_matches(&matcher, task))
            .collect::<Result<Vec<bool>, _>>()?;
        let removed = hits.iter().filter(|hit| **hit).count() as u64;
        let mut hits = hits.into_iter();
        tasks.retain(|_| !hits.next().unwrap_or(false));
        Ok(removed)
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<DirectoryUser>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_membership(&self, user_id: &str, tenant_id: &str) -> Result<Option<TenantMembership>, StoreError> {
        Ok(self
            .memberships
            .read()
            .await
            .iter()
            .find(|m| m.user_id == user_id && m.tenant_id == tenant_id)
            .cloned())
    }

    async fn memberships(&self, user_id: &str) -> Result<Vec<TenantMembership>, StoreError> {
        Ok(self
            .memberships
            .read()
            .await
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn super_admins_without_membership(&self) -> Result<Vec<DirectoryUser>, StoreError> {
        let users = self.users.read().await;
        let memberships = self.memberships.read().await;
        let mut orphans: Vec<DirectoryUser> = users
            .values()
            .filter(|u| u.role().is_super_admin())
            .filter(|u| !memberships.iter().any(|m| m.user_id == u.id))
            .cloned()
            .collect();
        orphans.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orphans)
    }

    async fn upsert_membership(&self, membership: TenantMembership) -> Result<TenantMembership, StoreError> {
        let mut memberships = self.memberships.write().await;
        match memberships
            .iter_mut()
            .find(|m| m.user_id == membership.user_id && m.tenant_id == membership.tenant_id)
        {
            Some(existing) => {
                existing.role = membership.role.clone();
                existing.is_default = membership.is_default;
                Ok(existing.clone())
            }
            None => {
                memberships.push(membership.clone());
                Ok(membership)
            }
        }
    }
}

#[async_trait]
impl ImportJobStore for MemoryStore {
    async fn enqueue(&self, job: ImportJob) -> Result<ImportJob, StoreError> {
        self.jobs.lock().await.push(job.clone());
        Ok(job)
    }

    async fn find(&self, tenant_id: &str, job_id: &str) -> Result<Option<ImportJob>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .find(|j| j.id == job_id && j.tenant_id == tenant_id)
            .cloned())
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<ImportJob>, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .iter_mut()
            .filter(|j| j.status == ImportJobStatus::Pending && !j.is_expired(now))
            .min_by_key(|j| j.created_at);

        Ok(next.map(|job| {
            job.status = ImportJobStatus::Processing;
            job.updated_at = now;
            job.clone()
        }))
    }

    async fn save(&self, job: &ImportJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().await;
        let slot = jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or_else(|| StoreError::NotFound(format!("Import job {}", job.id)))?;
        *slot = job.clone();
        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|j| !j.is_expired(now) || j.status == ImportJobStatus::Processing);
        Ok((before - jobs.len()) as u64)
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.lock().await;
        let mut due: Vec<Booking> = bookings
            .iter()
            .filter(|b| !b.reminder_sent && b.scheduled_at >= from && b.scheduled_at <= until)
            .cloned()
            .collect();
        due.sort_by_key(|b| b.scheduled_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_reminded(&self, booking_id: &str) -> Result<bool, StoreError> {
        let mut bookings = self.bookings.lock().await;
        match bookings.iter_mut().find(|b| b.id == booking_id && !b.reminder_sent) {
            Some(booking) => {
                booking.reminder_sent = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SecuritySettingsStore for MemoryStore {
    async fn get(&self, tenant_id: &str) -> Result<SecuritySettings, StoreError> {
        Ok(self
            .settings
            .read()
            .await
            .get(tenant_id)
            .cloned()
            .unwrap_or_else(|| SecuritySettings::defaults_for(tenant_id)))
    }

    async fn put(&self, settings: SecuritySettings) -> Result<(), StoreError> {
        self.settings.write().await.insert(settings.tenant_id.clone(), settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewTask, TaskStatus};
    use crate::tenant::scope::TenantScope;
    use serde_json::json;
    use std::sync::Arc;

    fn new_task(tenant: &str, title: &str) -> Task {
        Task::from_new(
            tenant,
            NewTask {
                title: title.into(),
                description: None,
                priority: None,
                status: None,
                assignee_id: None,
                due_at: None,
            },
        )
    }

    #[tokio::test]
    async fn scoped_queries_never_cross_tenants() {
        let store = MemoryStore::new();
        let a = store.insert(new_task("t1", "mine")).await.unwrap();
        let b = store.insert(new_task("t2", "theirs")).await.unwrap();

        let scope = TenantScope::tenant("t1");
        let listed = store.list(&scope.filter(), 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.id);

        let deleted = store
            .delete_where(&scope.merge(json!({"id": {"$in": [a.id.clone(), b.id.clone()]}})))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.list(&json!({}), 10).await.unwrap()[0].id, b.id);
    }

    #[tokio::test]
    async fn update_where_returns_updated_rows() {
        let store = MemoryStore::new();
        let task = store.insert(new_task("t1", "x")).await.unwrap();
        let updated = store
            .update_where(&json!({"id": task.id}), &TaskPatch::status(TaskStatus::Completed))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn concurrent_claims_never_share_a_job() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..5 {
            store
                .enqueue(ImportJob::pending("t1", "u1", "title\nx".into(), 3600, 3))
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.claim_next(Utc::now()).await.unwrap() }));
        }

        let mut claimed = Vec::new();
        for handle in handles {
            if let Some(job) = handle.await.unwrap() {
                claimed.push(job.id);
            }
        }
        claimed.sort();
        claimed.dedup();
        assert_eq!(claimed.len(), 5);
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired_jobs() {
        let store = MemoryStore::new();
        store.enqueue(ImportJob::pending("t1", "u1", String::new(), -1, 3)).await.unwrap();
        store.enqueue(ImportJob::pending("t1", "u1", String::new(), 3600, 3)).await.unwrap();
        assert_eq!(store.cleanup_expired(Utc::now()).await.unwrap(), 1);
        assert!(store.claim_next(Utc::now()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_filter_fields_are_rejected_even_when_empty() {
        let store = MemoryStore::new();
        let err = store.list(&json!({"owner": "u1"}), 10).await.unwrap_err();
        assert!(matches!(err, StoreError::Filter(crate::filter::FilterError::InvalidColumn(_))));

        store.insert(new_task("t1", "x")).await.unwrap();
        assert!(store.delete_where(&json!({"owner": "u1"})).await.is_err());
        assert_eq!(store.list(&json!({}), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cleanup_leaves_jobs_being_processed() {
        let store = MemoryStore::new();
        let job = store
            .enqueue(ImportJob::pending("t1", "u1", "title\nx".into(), 3600, 3))
            .await
            .unwrap();
        let mut claimed = store.claim_next(Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);

        // A later run sees the claimed job past its expiry
        let later = Utc::now() + chrono::Duration::hours(2);
        assert_eq!(store.cleanup_expired(later).await.unwrap(), 0);

        claimed.status = ImportJobStatus::Success;
        store.save(&claimed).await.unwrap();
        assert_eq!(store.cleanup_expired(later).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn settings_default_when_missing() {
        let store = MemoryStore::new();
        let settings = SecuritySettingsStore::get(&store, "t9").await.unwrap();
        assert!(!settings.step_up_mfa);
        assert!(settings.log_admin_access);
    }
}
