use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

use super::scope::TenantScope;
use crate::error::ApiError;
use crate::permissions::{self, Permission, Role};

/// Who is calling and on behalf of which tenant. Built once per request by
/// the resolver and handed to handlers as an extractor argument.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_slug: Option<String>,
    /// Global role from the session.
    pub role: Option<Role>,
    /// Role held through the membership of `tenant_id`.
    pub tenant_role: Option<Role>,
    pub is_super_admin: bool,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl TenantContext {
    pub fn anonymous(request_id: impl Into<String>) -> Self {
        Self {
            user_id: None,
            tenant_id: None,
            tenant_slug: None,
            role: None,
            tenant_role: None,
            is_super_admin: false,
            user_email: None,
            user_name: None,
            request_id: request_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn require_user(&self) -> Result<&str, ApiError> {
        self.user_id
            .as_deref()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }

    pub fn require_tenant(&self) -> Result<&str, ApiError> {
        self.tenant_id
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("Tenant context required"))
    }

    /// Scope for tenant-filtered store calls. Unrestricted when there is no tenant.
    pub fn scope(&self) -> TenantScope {
        TenantScope::from_option(self.tenant_id.as_deref())
    }

    /// Role used for permission checks: super admin wins, then the tenant
    /// membership role, then the global role.
    pub fn effective_role(&self) -> Option<Role> {
        if self.is_super_admin {
            return Some(Role::SuperAdmin);
        }
        self.tenant_role.or(self.role)
    }

    pub fn is_tenant_admin(&self) -> bool {
        self.is_super_admin || self.effective_role().map(|r| r.is_tenant_admin()).unwrap_or(false)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        permissions::has_permission(self.effective_role(), permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), ApiError> {
        if self.has_permission(permission) {
            return Ok(());
        }
        self.log_denial(permission.as_str());
        Err(ApiError::forbidden("Insufficient permissions"))
    }

    /// Passes when at least one of `any` is granted.
    pub fn require_any_permission(&self, any: &[Permission]) -> Result<(), ApiError> {
        if any.iter().any(|p| self.has_permission(*p)) {
            return Ok(());
        }
        let wanted: Vec<&str> = any.iter().map(|p| p.as_str()).collect();
        self.log_denial(&wanted.join("|"));
        Err(ApiError::forbidden("Insufficient permissions"))
    }

    /// All permissions granted to the effective role.
    pub fn granted_permissions(&self) -> Vec<Permission> {
        Permission::ALL.iter().copied().filter(|p| self.has_permission(*p)).collect()
    }

    pub(crate) fn log_denial(&self, wanted: &str) {
        warn!(
            request_id = %self.request_id,
            user_id = self.user_id.as_deref().unwrap_or("-"),
            tenant_id = self.tenant_id.as_deref().unwrap_or("-"),
            wanted,
            "Authorization denied"
        );
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<TenantContext>() {
            Some(ctx) => Ok(ctx.clone()),
            None => {
                error!(uri = %parts.uri, "Handler mounted without the tenant context wrapper");
                Err(ApiError::internal_server_error("Request context unavailable"))
            }
        }
    }
}
