use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-tenant security switches for super-admin access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    pub tenant_id: String,
    pub step_up_mfa: bool,
    pub log_admin_access: bool,
}

impl SecuritySettings {
    pub fn defaults_for(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            step_up_mfa: false,
            log_admin_access: true,
        }
    }
}
