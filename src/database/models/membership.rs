use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::permissions::Role;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantMembership {
    pub user_id: String,
    pub tenant_id: String,
    pub role: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl TenantMembership {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

/// User record as seen by the authorization layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    /// Base32 TOTP secret; `None` means no second factor is enrolled.
    #[serde(skip_serializing)]
    pub mfa_secret: Option<String>,
    /// Tenant the user signed up under, used when backfilling memberships.
    pub home_tenant_id: Option<String>,
}

impl DirectoryUser {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}
