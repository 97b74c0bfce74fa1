use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::context::TenantContext;
use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::permissions::{self, Role};
use crate::state::AppState;

/// Authorization requirements for a group of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPolicy {
    pub require_auth: bool,
    pub require_super_admin: bool,
    pub require_tenant_admin: bool,
    pub allowed_roles: Option<Vec<Role>>,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            require_auth: true,
            require_super_admin: false,
            require_tenant_admin: false,
            allowed_roles: None,
        }
    }
}

impl ContextPolicy {
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Context is resolved but no identity is required.
    pub fn public() -> Self {
        Self {
            require_auth: false,
            ..Self::default()
        }
    }

    pub fn super_admin(mut self) -> Self {
        self.require_super_admin = true;
        self
    }

    pub fn tenant_admin(mut self) -> Self {
        self.require_tenant_admin = true;
        self
    }

    pub fn roles(mut self, roles: &[Role]) -> Self {
        self.allowed_roles = Some(roles.to_vec());
        self
    }

    /// Checks run in order: identity, super admin, tenant admin, role list.
    pub fn check(&self, ctx: &TenantContext) -> Result<(), ApiError> {
        if !self.require_auth {
            return Ok(());
        }
        if !ctx.is_authenticated() {
            return Err(ApiError::unauthorized("Authentication required"));
        }
        if self.require_super_admin && !ctx.is_super_admin {
            return Err(ApiError::forbidden("Super admin access required"));
        }
        if self.require_tenant_admin && !ctx.is_tenant_admin() {
            return Err(ApiError::forbidden("Tenant admin access required"));
        }
        if let Some(allowed) = &self.allowed_roles {
            if !permissions::has_role(ctx.effective_role(), allowed) {
                return Err(ApiError::forbidden("Insufficient permissions"));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PolicyGuard {
    state: AppState,
    policy: Arc<ContextPolicy>,
}

/// Resolves the tenant context, enforces `policy`, and stores the context in
/// request extensions for the `TenantContext` extractor.
pub async fn with_tenant_context(State(guard): State<PolicyGuard>, mut request: Request, next: Next) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let ctx = match guard.state.resolver.resolve(request.headers(), &request_id).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = guard.policy.check(&ctx) {
        warn!(
            request_id = %ctx.request_id,
            user_id = ctx.user_id.as_deref().unwrap_or("-"),
            tenant_id = ctx.tenant_id.as_deref().unwrap_or("-"),
            path = %request.uri().path(),
            "Request rejected: {}",
            e.message()
        );
        return e.into_response();
    }

    if ctx.is_super_admin {
        log_super_admin_access(&guard.state, &ctx, request.uri().path()).await;
    }

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

async fn log_super_admin_access(state: &AppState, ctx: &TenantContext, path: &str) {
    let Some(tenant_id) = ctx.tenant_id.as_deref() else {
        return;
    };
    match state.security.get(tenant_id).await {
        Ok(settings) if settings.log_admin_access => {
            info!(
                request_id = %ctx.request_id,
                user_id = ctx.user_id.as_deref().unwrap_or("-"),
                tenant_id,
                path,
                "Super admin access"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(tenant_id, "Could not load security settings: {}", e),
    }
}

/// Mounts the wrapper on every route of `router`.
pub fn guard(router: Router<AppState>, state: &AppState, policy: ContextPolicy) -> Router<AppState> {
    let guard = PolicyGuard {
        state: state.clone(),
        policy: Arc::new(policy),
    };
    router.route_layer(middleware::from_fn_with_state(guard, with_tenant_context))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> TenantContext {
        TenantContext {
            user_id: Some("u1".into()),
            tenant_id: Some("t1".into()),
            tenant_role: Some(role),
            ..TenantContext::anonymous("r")
        }
    }

    #[test]
    fn default_policy_requires_authentication() {
        let policy = ContextPolicy::default();
        assert!(policy.require_auth);
        let err = policy.check(&TenantContext::anonymous("r")).unwrap_err();
        assert_eq!(err.message(), "Authentication required");
        assert!(policy.check(&user(Role::Client)).is_ok());
    }

    #[test]
    fn public_policy_admits_anonymous() {
        assert!(ContextPolicy::public().check(&TenantContext::anonymous("r")).is_ok());
    }

    #[test]
    fn super_admin_policy_rejects_tenant_admins() {
        let policy = ContextPolicy::authenticated().super_admin();
        assert_eq!(policy.check(&user(Role::Admin)).unwrap_err().message(), "Super admin access required");

        let root = TenantContext { is_super_admin: true, ..user(Role::Client) };
        assert!(policy.check(&root).is_ok());
    }

    #[test]
    fn tenant_admin_policy() {
        let policy = ContextPolicy::authenticated().tenant_admin();
        assert!(policy.check(&user(Role::Admin)).is_ok());
        assert_eq!(policy.check(&user(Role::TeamLead)).unwrap_err().message(), "Tenant admin access required");
    }

    #[test]
    fn role_allow_list() {
        let policy = ContextPolicy::authenticated().roles(&[Role::TeamLead, Role::Admin]);
        assert!(policy.check(&user(Role::TeamLead)).is_ok());
        assert_eq!(policy.check(&user(Role::Staff)).unwrap_err().message(), "Insufficient permissions");
        assert!(policy.check(&user(Role::Unrecognized)).is_err());
    }
}
