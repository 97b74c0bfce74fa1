pub mod step_up;
pub mod totp;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

const SESSION_PURPOSE: &str = "session";
const STEP_UP_PURPOSE: &str = "step_up";

/// Session token claims. `role` is the user's global role; `tenant_role` is
/// the role held through the membership of `tenant_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub tenant_slug: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub tenant_role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub purpose: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, tenant_id: Option<String>, role: Option<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: sub.into(),
            tenant_id,
            tenant_slug: None,
            role,
            tenant_role: None,
            email: None,
            name: None,
            purpose: SESSION_PURPOSE.to_string(),
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn with_profile(mut self, email: Option<String>, name: Option<String>) -> Self {
        self.email = email;
        self.name = name;
        self
    }

    pub fn with_tenant_role(mut self, tenant_role: Option<String>) -> Self {
        self.tenant_role = tenant_role;
        self
    }
}

/// Short-lived proof that the holder passed a second factor for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepUpClaims {
    pub sub: String,
    pub tenant_id: Option<String>,
    pub purpose: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
    InvalidToken(String),
    WrongPurpose,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::WrongPurpose => write!(f, "JWT issued for a different purpose"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Signs and verifies session and step-up tokens with one HMAC secret.
#[derive(Clone)]
pub struct JwtService {
    secret: String,
    session_hours: u64,
    step_up_minutes: u64,
}

impl JwtService {
    pub fn new(secret: impl Into<String>, session_hours: u64, step_up_minutes: u64) -> Self {
        Self {
            secret: secret.into(),
            session_hours,
            step_up_minutes,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.jwt_expiry_hours,
            config.step_up_expiry_minutes,
        )
    }

    pub fn session_hours(&self) -> u64 {
        self.session_hours
    }

    pub fn step_up_minutes(&self) -> u64 {
        self.step_up_minutes
    }

    pub fn issue_session(&self, claims: &Claims) -> Result<String, JwtError> {
        self.sign(claims)
    }

    pub fn issue_step_up(&self, user_id: &str, tenant_id: Option<&str>) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = StepUpClaims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.map(str::to_string),
            purpose: STEP_UP_PURPOSE.to_string(),
            exp: (now + Duration::minutes(self.step_up_minutes as i64)).timestamp(),
            iat: now.timestamp(),
        };
        self.sign(&claims)
    }

    pub fn verify_session(&self, token: &str) -> Result<Claims, JwtError> {
        let claims: Claims = self.verify(token)?;
        if claims.purpose != SESSION_PURPOSE {
            return Err(JwtError::WrongPurpose);
        }
        Ok(claims)
    }

    pub fn verify_step_up(&self, token: &str) -> Result<StepUpClaims, JwtError> {
        let claims: StepUpClaims = self.verify(token)?;
        if claims.purpose != STEP_UP_PURPOSE {
            return Err(JwtError::WrongPurpose);
        }
        Ok(claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), claims, &encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    fn verify<T: for<'de> Deserialize<'de>>(&self, token: &str) -> Result<T, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        decode::<T>(token, &decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}
