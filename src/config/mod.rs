use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub session: SessionConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Absent URL selects the in-memory stores.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub step_up_expiry_minutes: u64,
    #[serde(skip_serializing)]
    pub tenant_cookie_secret: Option<String>,
    pub allow_test_bypass: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub lookup_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(skip_serializing)]
    pub cron_secret: Option<String>,
    pub import_batch_size: usize,
    pub import_job_ttl_secs: i64,
    pub import_max_retries: i32,
    pub reminder_batch_size: usize,
    pub reminder_hours: Vec<f64>,
    pub reminder_window_hours: f64,
    pub reminder_concurrency: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment, Environment::Development)
    }

    /// Test bypass is never honored in production, whatever the flag says.
    pub fn test_bypass_enabled(&self) -> bool {
        self.security.allow_test_bypass && !self.is_production()
    }

    pub fn jwt_secret_missing(&self) -> bool {
        self.security.jwt_secret.trim().is_empty()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_STEP_UP_EXPIRY_MINUTES") {
            self.security.step_up_expiry_minutes = v.parse().unwrap_or(self.security.step_up_expiry_minutes);
        }
        if let Ok(v) = env::var("TENANT_COOKIE_SECRET") {
            self.security.tenant_cookie_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SECURITY_ALLOW_TEST_BYPASS") {
            self.security.allow_test_bypass = v.parse().unwrap_or(self.security.allow_test_bypass);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_LOOKUP_TIMEOUT_MS") {
            self.session.lookup_timeout_ms = v.parse().unwrap_or(self.session.lookup_timeout_ms);
        }

        // Jobs overrides
        if let Ok(v) = env::var("CRON_SECRET") {
            self.jobs.cron_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("JOBS_IMPORT_BATCH_SIZE") {
            self.jobs.import_batch_size = v.parse().unwrap_or(self.jobs.import_batch_size);
        }
        if let Ok(v) = env::var("JOBS_IMPORT_TTL_SECS") {
            self.jobs.import_job_ttl_secs = v.parse().unwrap_or(self.jobs.import_job_ttl_secs);
        }
        if let Ok(v) = env::var("JOBS_REMINDER_BATCH_SIZE") {
            self.jobs.reminder_batch_size = v.parse().unwrap_or(self.jobs.reminder_batch_size);
        }
        if let Ok(v) = env::var("JOBS_REMINDER_HOURS") {
            let hours: Vec<f64> = v.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if !hours.is_empty() {
                self.jobs.reminder_hours = hours;
            }
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                step_up_expiry_minutes: 15,
                tenant_cookie_secret: None,
                allow_test_bypass: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            session: SessionConfig { lookup_timeout_ms: 3000 },
            jobs: JobsConfig::defaults(),
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7,
                step_up_expiry_minutes: 15,
                tenant_cookie_secret: None,
                allow_test_bypass: false,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            session: SessionConfig { lookup_timeout_ms: 3000 },
            jobs: JobsConfig::defaults(),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7,
                step_up_expiry_minutes: 15,
                tenant_cookie_secret: None,
                allow_test_bypass: false,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            session: SessionConfig { lookup_timeout_ms: 3000 },
            jobs: JobsConfig::defaults(),
        }
    }
}

impl JobsConfig {
    fn defaults() -> Self {
        Self {
            cron_secret: None,
            import_batch_size: 10,
            import_job_ttl_secs: 60 * 60,
            import_max_retries: 3,
            reminder_batch_size: 500,
            reminder_hours: vec![24.0, 2.0],
            reminder_window_hours: 0.25,
            reminder_concurrency: 10,
        }
    }
}
