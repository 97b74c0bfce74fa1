use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub tenant_id: String,
    pub client_email: String,
    pub scheduled_at: DateTime<Utc>,
    pub reminder_sent: bool,
}
