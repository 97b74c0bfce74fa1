use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::context::TenantContext;
use crate::auth::{JwtError, JwtService};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::permissions::Role;
use crate::store::{DirectoryStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";
pub const TENANT_SIG_COOKIE: &str = "tenant_sig";
pub const TEST_USER_HEADER: &str = "x-test-user";
pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const TENANT_SLUG_HEADER: &str = "x-tenant-slug";

/// Identity recovered from a session credential.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub tenant_slug: Option<String>,
    pub role: Option<Role>,
    pub tenant_role: Option<Role>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Source of sessions. `Ok(None)` means the request carries no credential.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn lookup(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError>;
}

/// Reads a session JWT from `Authorization: Bearer` or the `session` cookie
/// and fills in the tenant role from the membership table when the token
/// does not carry one.
pub struct JwtSessionProvider {
    jwt: JwtService,
    directory: Arc<dyn DirectoryStore>,
}

impl JwtSessionProvider {
    pub fn new(jwt: JwtService, directory: Arc<dyn DirectoryStore>) -> Self {
        Self { jwt, directory }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn lookup(&self, headers: &HeaderMap) -> Result<Option<Session>, SessionError> {
        let Some(token) = bearer_token(headers).or_else(|| cookie(headers, SESSION_COOKIE)) else {
            return Ok(None);
        };

        let claims = self.jwt.verify_session(&token)?;

        let mut tenant_role = claims.tenant_role.as_deref().map(Role::parse);
        if tenant_role.is_none() {
            if let Some(tenant_id) = claims.tenant_id.as_deref() {
                tenant_role = self
                    .directory
                    .find_membership(&claims.sub, tenant_id)
                    .await?
                    .map(|m| m.role());
            }
        }

        Ok(Some(Session {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            tenant_slug: claims.tenant_slug,
            role: claims.role.as_deref().map(Role::parse),
            tenant_role,
            email: claims.email,
            name: claims.name,
        }))
    }
}

/// Turns request headers into a `TenantContext`.
pub struct ContextResolver {
    provider: Arc<dyn SessionProvider>,
    lookup_timeout: Duration,
    allow_test_bypass: bool,
    tenant_cookie_secret: Option<String>,
    directory: Option<Arc<dyn DirectoryStore>>,
}

impl ContextResolver {
    pub fn new(provider: Arc<dyn SessionProvider>, lookup_timeout: Duration) -> Self {
        Self {
            provider,
            lookup_timeout,
            allow_test_bypass: false,
            tenant_cookie_secret: None,
            directory: None,
        }
    }

    pub fn from_config(provider: Arc<dyn SessionProvider>, config: &AppConfig) -> Self {
        Self {
            provider,
            lookup_timeout: Duration::from_millis(config.session.lookup_timeout_ms),
            allow_test_bypass: config.test_bypass_enabled(),
            tenant_cookie_secret: config.security.tenant_cookie_secret.clone(),
            directory: None,
        }
    }

    pub fn with_test_bypass(mut self, enabled: bool) -> Self {
        self.allow_test_bypass = enabled;
        self
    }

    pub fn with_tenant_cookie_secret(mut self, secret: Option<String>) -> Self {
        self.tenant_cookie_secret = secret;
        self
    }

    /// Membership source for sessions that pick their tenant per request.
    /// Without one, `x-tenant-id` is ignored for non super admins.
    pub fn with_directory(mut self, directory: Arc<dyn DirectoryStore>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Missing or unusable credentials produce an anonymous context. Errors are
    /// a bad tenant signature and a requested tenant the user does not belong to.
    pub async fn resolve(&self, headers: &HeaderMap, request_id: &str) -> Result<TenantContext, ApiError> {
        let session = match self.test_session(headers) {
            Some(session) => Some(session),
            None => self.lookup_session(headers, request_id).await,
        };

        let mut ctx = TenantContext::anonymous(request_id);
        match session {
            Some(session) => {
                ctx.is_super_admin = session.role.map(|r| r.is_super_admin()).unwrap_or(false);
                ctx.user_id = Some(session.user_id);
                ctx.tenant_id = session.tenant_id;
                ctx.tenant_slug = session.tenant_slug;
                ctx.role = session.role;
                ctx.tenant_role = session.tenant_role;
                ctx.user_email = session.email;
                ctx.user_name = session.name;

                self.check_tenant_signature(headers, &ctx)?;
                if ctx.tenant_id.is_none() {
                    self.tenant_from_request(headers, &mut ctx).await?;
                }
            }
            None => {
                ctx.tenant_id = header_string(headers, TENANT_ID_HEADER);
                ctx.tenant_slug = header_string(headers, TENANT_SLUG_HEADER);
            }
        }

        Ok(ctx)
    }

    /// Session carries no tenant: take `x-tenant-id` if the user is a member
    /// of that tenant. Super admins may enter any tenant.
    async fn tenant_from_request(&self, headers: &HeaderMap, ctx: &mut TenantContext) -> Result<(), ApiError> {
        let (Some(requested), Some(user_id)) = (header_string(headers, TENANT_ID_HEADER), ctx.user_id.clone()) else {
            return Ok(());
        };

        if ctx.is_super_admin {
            ctx.tenant_id = Some(requested);
            ctx.tenant_slug = header_string(headers, TENANT_SLUG_HEADER);
            return Ok(());
        }

        let Some(directory) = self.directory.as_ref() else {
            debug!(request_id = %ctx.request_id, "No membership directory, ignoring tenant header");
            return Ok(());
        };

        match tokio::time::timeout(self.lookup_timeout, directory.find_membership(&user_id, &requested)).await {
            Ok(Ok(Some(membership))) => {
                ctx.tenant_role = Some(membership.role());
                ctx.tenant_id = Some(requested);
                ctx.tenant_slug = header_string(headers, TENANT_SLUG_HEADER);
                Ok(())
            }
            Ok(Ok(None)) => {
                warn!(
                    request_id = %ctx.request_id,
                    user_id = %user_id,
                    tenant_id = %requested,
                    "Requested tenant is not one of the user's memberships"
                );
                Err(ApiError::forbidden("Tenant access denied"))
            }
            Ok(Err(e)) => {
                warn!(request_id = %ctx.request_id, "Membership lookup failed, continuing without tenant: {}", e);
                Ok(())
            }
            Err(_) => {
                warn!(request_id = %ctx.request_id, "Membership lookup timed out, continuing without tenant");
                Ok(())
            }
        }
    }

    async fn lookup_session(&self, headers: &HeaderMap, request_id: &str) -> Option<Session> {
        match tokio::time::timeout(self.lookup_timeout, self.provider.lookup(headers)).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!(request_id, "Session lookup failed, continuing without session: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    request_id,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Session lookup timed out, continuing without session"
                );
                None
            }
        }
    }

    /// `x-test-user: id:role:tenant`, role and tenant optional.
    fn test_session(&self, headers: &HeaderMap) -> Option<Session> {
        if !self.allow_test_bypass {
            return None;
        }
        let raw = header_string(headers, TEST_USER_HEADER)?;
        let mut parts = raw.splitn(3, ':');
        let user_id = parts.next().filter(|s| !s.is_empty())?.to_string();
        let role = parts.next().filter(|s| !s.is_empty()).map(Role::parse);
        let tenant_id = parts.next().filter(|s| !s.is_empty()).map(str::to_string);

        debug!(user_id = %user_id, "Using test bypass session");
        Some(Session {
            user_id,
            tenant_id,
            role,
            tenant_role: role,
            ..Session::default()
        })
    }

    /// A `tenant_sig` cookie must match the session's tenant; one sent by a
    /// session without a tenant is always rejected.
    fn check_tenant_signature(&self, headers: &HeaderMap, ctx: &TenantContext) -> Result<(), ApiError> {
        let (Some(user_id), Some(signature)) = (ctx.user_id.as_deref(), cookie(headers, TENANT_SIG_COOKIE)) else {
            return Ok(());
        };
        let Some(tenant_id) = ctx.tenant_id.as_deref() else {
            warn!(request_id = %ctx.request_id, user_id, "Tenant cookie present but session has no tenant");
            return Err(ApiError::forbidden("Invalid tenant signature"));
        };
        let Some(secret) = self.tenant_cookie_secret.as_deref() else {
            return Ok(());
        };

        if verify_tenant_signature(secret, tenant_id, user_id, &signature) {
            Ok(())
        } else {
            warn!(request_id = %ctx.request_id, user_id, tenant_id, "Tenant signature mismatch");
            Err(ApiError::forbidden("Invalid tenant signature"))
        }
    }
}

/// Hex HMAC-SHA256 of `tenantId:userId`, the value of the `tenant_sig` cookie.
pub fn sign_tenant(secret: &str, tenant_id: &str, user_id: &str) -> Option<String> {
    let mac = tenant_mac(secret, tenant_id, user_id)?;
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_tenant_signature(secret: &str, tenant_id: &str, user_id: &str, signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    match tenant_mac(secret, tenant_id, user_id) {
        Some(mac) => mac.verify_slice(&signature).is_ok(),
        None => false,
    }
}

fn tenant_mac(secret: &str, tenant_id: &str, user_id: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(tenant_id.as_bytes());
    mac.update(b":");
    mac.update(user_id.as_bytes());
    Some(mac)
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty())
}
