use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "import_job_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportJobStatus {
    Pending,
    Processing,
    Success,
    PartialSuccess,
    Failed,
}

impl ImportJobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, ImportJobStatus::Success | ImportJobStatus::PartialSuccess | ImportJobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    /// 1-based line number in the uploaded file, header included.
    pub row_number: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: String,
    pub tenant_id: String,
    pub created_by: String,
    pub status: ImportJobStatus,
    #[serde(skip_serializing)]
    pub csv: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub success_count: i32,
    pub failure_count: i32,
    pub errors: Json<Vec<ImportRowError>>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn pending(tenant_id: &str, created_by: &str, csv: String, ttl_secs: i64, max_retries: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            created_by: created_by.to_string(),
            status: ImportJobStatus::Pending,
            csv,
            total_rows: 0,
            processed_rows: 0,
            success_count: 0,
            failure_count: 0,
            errors: Json(Vec::new()),
            retry_count: 0,
            max_retries,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
