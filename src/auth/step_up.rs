//! Second-factor checks in front of super-admin operations.
//!
//! A tenant opts in through `SecuritySettings::step_up_mfa`. When enabled, a
//! request must carry either a step-up token minted by `POST /api/auth/step-up`
//! or a fresh TOTP code. Every lookup failure counts as "not verified".

use axum::http::HeaderMap;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{totp, JwtService};
use crate::error::ApiError;
use crate::store::{DirectoryStore, SecuritySettingsStore};

pub const STEP_UP_TOKEN_HEADER: &str = "x-step-up-token";
pub const MFA_OTP_HEADER: &str = "x-mfa-otp";

#[derive(Clone)]
pub struct StepUpVerifier {
    jwt: JwtService,
    settings: Arc<dyn SecuritySettingsStore>,
    directory: Arc<dyn DirectoryStore>,
}

impl StepUpVerifier {
    pub fn new(jwt: JwtService, settings: Arc<dyn SecuritySettingsStore>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self { jwt, settings, directory }
    }

    /// True when the tenant does not require step-up, or when the request
    /// proves a second factor for `user_id`. Requests without a tenant always
    /// need the proof.
    pub async fn verify_super_admin_step_up(&self, headers: &HeaderMap, user_id: &str, tenant_id: Option<&str>) -> bool {
        if let Some(tenant) = tenant_id {
            match self.settings.get(tenant).await {
                Ok(settings) if !settings.step_up_mfa => return true,
                Ok(_) => {}
                Err(e) => {
                    warn!(tenant_id = tenant, "Could not load security settings: {}", e);
                    return false;
                }
            }
        }

        if let Some(token) = header_value(headers, STEP_UP_TOKEN_HEADER) {
            if self.token_is_valid(token, user_id, tenant_id) {
                return true;
            }
        }

        match header_value(headers, MFA_OTP_HEADER) {
            Some(code) => self.code_is_valid(user_id, code).await,
            None => false,
        }
    }

    /// Handler-facing form of the check.
    pub async fn require(&self, headers: &HeaderMap, user_id: &str, tenant_id: Option<&str>) -> Result<(), ApiError> {
        if self.verify_super_admin_step_up(headers, user_id, tenant_id).await {
            Ok(())
        } else {
            warn!(user_id, tenant_id = tenant_id.unwrap_or("-"), "Step-up verification failed");
            Err(ApiError::step_up_required())
        }
    }

    /// Exchanges a TOTP code for a short-lived step-up token.
    pub async fn issue_token(&self, user_id: &str, tenant_id: Option<&str>, code: &str) -> Result<String, ApiError> {
        let code = code.trim();
        if code.len() < totp::DIGITS {
            return Err(ApiError::invalid_field("code", "Verification code must be at least 6 digits"));
        }

        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| ApiError::forbidden("Multi-factor authentication is not enrolled"))?;
        let secret = user
            .mfa_secret
            .ok_or_else(|| ApiError::forbidden("Multi-factor authentication is not enrolled"))?;

        if !totp::verify(&secret, code, Utc::now().timestamp()) {
            warn!(user_id, "Rejected step-up code");
            return Err(ApiError::unauthorized("Invalid verification code"));
        }

        Ok(self.jwt.issue_step_up(user_id, tenant_id)?)
    }

    fn token_is_valid(&self, token: &str, user_id: &str, tenant_id: Option<&str>) -> bool {
        match self.jwt.verify_step_up(token) {
            Ok(claims) => claims.sub == user_id && claims.tenant_id.as_deref() == tenant_id,
            Err(e) => {
                debug!("Step-up token rejected: {}", e);
                false
            }
        }
    }

    async fn code_is_valid(&self, user_id: &str, code: &str) -> bool {
        match self.directory.find_user(user_id).await {
            Ok(Some(user)) => user
                .mfa_secret
                .as_deref()
                .map(|secret| totp::verify(secret, code, Utc::now().timestamp()))
                .unwrap_or(false),
            Ok(None) => false,
            Err(e) => {
                warn!(user_id, "Could not load user for step-up: {}", e);
                false
            }
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{DirectoryUser, SecuritySettings};
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;

    const SECRET_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    async fn verifier(step_up_mfa: bool) -> (StepUpVerifier, JwtService) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(DirectoryUser {
                id: "root".into(),
                email: "root@example.com".into(),
                name: None,
                role: "SUPER_ADMIN".into(),
                mfa_secret: Some(SECRET_B32.into()),
                home_tenant_id: Some("t1".into()),
            })
            .await;
        store
            .put(SecuritySettings { step_up_mfa, ..SecuritySettings::defaults_for("t1") })
            .await
            .unwrap();

        let jwt = JwtService::new("step-up-test", 1, 15);
        (StepUpVerifier::new(jwt.clone(), store.clone(), store), jwt)
    }

    fn current_code() -> String {
        let secret = totp::decode_base32(SECRET_B32).unwrap();
        totp::code_at(&secret, Utc::now().timestamp()).unwrap()
    }

    #[tokio::test]
    async fn disabled_setting_passes_without_proof() {
        let (verifier, _) = verifier(false).await;
        assert!(verifier.verify_super_admin_step_up(&HeaderMap::new(), "root", Some("t1")).await);
    }

    #[tokio::test]
    async fn enabled_setting_fails_closed_without_proof() {
        let (verifier, _) = verifier(true).await;
        assert!(!verifier.verify_super_admin_step_up(&HeaderMap::new(), "root", Some("t1")).await);
        assert!(!verifier.verify_super_admin_step_up(&HeaderMap::new(), "root", None).await);
    }

    #[tokio::test]
    async fn accepts_matching_step_up_token_only() {
        let (verifier, jwt) = verifier(true).await;

        let mut headers = HeaderMap::new();
        let token = jwt.issue_step_up("root", Some("t1")).unwrap();
        headers.insert(STEP_UP_TOKEN_HEADER, HeaderValue::from_str(&token).unwrap());
        assert!(verifier.verify_super_admin_step_up(&headers, "root", Some("t1")).await);
        assert!(!verifier.verify_super_admin_step_up(&headers, "someone-else", Some("t1")).await);

        let other_tenant = jwt.issue_step_up("root", Some("t2")).unwrap();
        headers.insert(STEP_UP_TOKEN_HEADER, HeaderValue::from_str(&other_tenant).unwrap());
        assert!(!verifier.verify_super_admin_step_up(&headers, "root", Some("t1")).await);
    }

    #[tokio::test]
    async fn accepts_current_totp_code() {
        let (verifier, _) = verifier(true).await;
        let mut headers = HeaderMap::new();
        headers.insert(MFA_OTP_HEADER, HeaderValue::from_str(&current_code()).unwrap());
        assert!(verifier.verify_super_admin_step_up(&headers, "root", Some("t1")).await);

        headers.insert(MFA_OTP_HEADER, HeaderValue::from_static("garbage"));
        assert!(!verifier.verify_super_admin_step_up(&headers, "root", Some("t1")).await);
    }

    #[tokio::test]
    async fn issue_token_rejects_short_codes() {
        let (verifier, _) = verifier(true).await;
        let err = verifier.issue_token("root", Some("t1"), "123").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn issued_token_satisfies_the_check() {
        let (verifier, _) = verifier(true).await;
        let token = verifier.issue_token("root", Some("t1"), &current_code()).await.unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(STEP_UP_TOKEN_HEADER, HeaderValue::from_str(&token).unwrap());
        assert!(verifier.verify_super_admin_step_up(&headers, "root", Some("t1")).await);
    }
}
