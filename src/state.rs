use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::step_up::StepUpVerifier;
use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager};
use crate::i18n::{self, TranslationCatalog};
use crate::jobs::{LogNotifier, ReminderNotifier};
use crate::store::{
    BookingStore, DirectoryStore, ImportJobStore, MemoryStore, PgStore, SecuritySettingsStore, TaskStore,
};
use crate::tenant::{ContextResolver, JwtSessionProvider};

/// Everything a handler may touch. Cloned per request; all fields are shared.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
    pub resolver: Arc<ContextResolver>,
    pub step_up: StepUpVerifier,
    pub tasks: Arc<dyn TaskStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub imports: Arc<dyn ImportJobStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub security: Arc<dyn SecuritySettingsStore>,
    pub notifier: Arc<dyn ReminderNotifier>,
    pub translations: &'static TranslationCatalog,
    pub database: Option<DatabaseManager>,
}

/// Store set handed to `AppState::from_stores`.
#[derive(Clone)]
pub struct Stores {
    pub tasks: Arc<dyn TaskStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub imports: Arc<dyn ImportJobStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub security: Arc<dyn SecuritySettingsStore>,
}

impl Stores {
    /// Every store backed by one in-memory instance.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            tasks: store.clone(),
            directory: store.clone(),
            imports: store.clone(),
            bookings: store.clone(),
            security: store,
        }
    }

    pub fn postgres(db: DatabaseManager) -> Self {
        let store = Arc::new(PgStore::new(db));
        Self {
            tasks: store.clone(),
            directory: store.clone(),
            imports: store.clone(),
            bookings: store.clone(),
            security: store,
        }
    }
}

impl AppState {
    pub fn from_stores(config: AppConfig, stores: Stores, database: Option<DatabaseManager>) -> Self {
        let jwt = JwtService::from_config(&config.security);
        let provider = Arc::new(JwtSessionProvider::new(jwt.clone(), stores.directory.clone()));
        let resolver = Arc::new(
            ContextResolver::from_config(provider, &config).with_directory(stores.directory.clone()),
        );
        let step_up = StepUpVerifier::new(jwt.clone(), stores.security.clone(), stores.directory.clone());

        Self {
            config: Arc::new(config),
            jwt,
            resolver,
            step_up,
            tasks: stores.tasks,
            directory: stores.directory,
            imports: stores.imports,
            bookings: stores.bookings,
            security: stores.security,
            notifier: Arc::new(LogNotifier),
            translations: i18n::catalog(),
            database,
        }
    }

    pub fn in_memory(config: AppConfig, store: Arc<MemoryStore>) -> Self {
        Self::from_stores(config, Stores::memory(store), None)
    }

    /// Postgres stores when `DATABASE_URL` is set, in-memory stores otherwise.
    pub async fn connect(config: AppConfig) -> Result<Self, DatabaseError> {
        if config.database.url.is_none() {
            warn!("DATABASE_URL not set; using in-memory stores");
            return Ok(Self::in_memory(config, Arc::new(MemoryStore::new())));
        }

        let db = DatabaseManager::connect(&config.database).await?;
        db.migrate().await?;
        info!("Using Postgres stores");
        Ok(Self::from_stores(config, Stores::postgres(db.clone()), Some(db)))
    }

    pub fn with_task_store(mut self, tasks: Arc<dyn TaskStore>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReminderNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_resolver(mut self, resolver: ContextResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }
}
