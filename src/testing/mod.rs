//! Builders shared by unit tests: a development config with fixed secrets,
//! an in-memory `AppState`, and a task store that records every call.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::auth::Claims;
use crate::config::AppConfig;
use crate::database::models::{DirectoryUser, Task, TaskPatch};
use crate::state::AppState;
use crate::store::{MemoryStore, StoreError, TaskStore};

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_CRON_SECRET: &str = "cron-secret";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = TEST_JWT_SECRET.to_string();
    config.security.allow_test_bypass = true;
    config.jobs.cron_secret = Some(TEST_CRON_SECRET.to_string());
    config
}

pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (AppState::in_memory(test_config(), store.clone()), store)
}

/// `x-test-user` value for the bypass session.
pub fn test_user(user_id: &str, role: &str, tenant_id: &str) -> String {
    format!("{}:{}:{}", user_id, role, tenant_id)
}

pub fn session_token(state: &AppState, user_id: &str, tenant_id: Option<&str>, role: &str) -> String {
    let claims = Claims::new(user_id, tenant_id.map(str::to_string), Some(role.to_string()), 1);
    state.jwt.issue_session(&claims).expect("test token")
}

pub fn directory_user(id: &str, role: &str, home_tenant: Option<&str>) -> DirectoryUser {
    DirectoryUser {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: None,
        role: role.to_string(),
        mfa_secret: None,
        home_tenant_id: home_tenant.map(str::to_string),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskCall {
    List(Value),
    Insert,
    UpdateWhere(Value),
    DeleteWhere(Value),
}

/// Delegates to a `MemoryStore` and records each call with its filter.
#[derive(Default)]
pub struct RecordingTaskStore {
    inner: MemoryStore,
    calls: Mutex<Vec<TaskCall>>,
}

impl RecordingTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TaskCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: TaskCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl TaskStore for RecordingTaskStore {
    async fn list(&self, filter: &Value, limit: usize) -> Result<Vec<Task>, StoreError> {
        self.record(TaskCall::List(filter.clone()));
        self.inner.list(filter, limit).await
    }

    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        self.record(TaskCall::Insert);
        self.inner.insert(task).await
    }

    async fn update_where(&self, filter: &Value, patch: &TaskPatch) -> Result<Vec<Task>, StoreError> {
        self.record(TaskCall::UpdateWhere(filter.clone()));
        self.inner.update_where(filter, patch).await
    }

    async fn delete_where(&self, filter: &Value) -> Result<u64, StoreError> {
        self.record(TaskCall::DeleteWhere(filter.clone()));
        self.inner.delete_where(filter).await
    }
}
