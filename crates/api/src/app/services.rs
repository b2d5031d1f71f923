//! Service wiring: one store handle, one repository per collection, and the
//! token service, built once at startup and shared by every handler.

use std::sync::Arc;

use crewdesk_auth::TokenService;
use crewdesk_customers::{Customer, CustomerSession};
use crewdesk_employees::{Assignment, Employee};
use crewdesk_infra::{InMemoryDocumentStore, Repository, SharedStore};
use crewdesk_jobs::Job;

use crate::app::dto::CookieSettings;
use crate::app::errors::{ApiError, ApiResult};
use crate::config::{AppConfig, StoreBackend};

pub struct AppServices {
    pub customers: Repository<Customer>,
    pub sessions: Repository<CustomerSession>,
    pub employees: Repository<Employee>,
    pub jobs: Repository<Job>,
    pub assignments: Repository<Assignment>,
    pub tokens: TokenService,
    pub cookies: CookieSettings,
}

pub async fn open_store(backend: &StoreBackend) -> anyhow::Result<SharedStore> {
    match backend {
        StoreBackend::Memory => {
            tracing::info!("using in-memory document store");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
        #[cfg(feature = "mongodb")]
        StoreBackend::Mongo { uri, database } => {
            let store = crewdesk_infra::store::MongoDocumentStore::connect(uri, database).await?;
            tracing::info!(database = %database, "connected to MongoDB");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongodb"))]
        StoreBackend::Mongo { .. } => {
            anyhow::bail!("STORE_BACKEND=mongo requires the `mongodb` feature")
        }
    }
}

/// Bind every repository to `store`, creating unique indexes as needed.
pub async fn build_services(store: SharedStore, config: &AppConfig) -> anyhow::Result<AppServices> {
    Ok(AppServices {
        customers: Repository::bind(store.clone()).await?,
        sessions: Repository::bind(store.clone()).await?,
        employees: Repository::bind(store.clone()).await?,
        jobs: Repository::bind(store.clone()).await?,
        assignments: Repository::bind(store).await?,
        tokens: TokenService::new(&config.jwt_secret, config.access_ttl, config.refresh_ttl),
        cookies: CookieSettings {
            secure: config.cookie_secure,
            max_age_secs: config.refresh_ttl.num_seconds(),
        },
    })
}

/// Hashes on the blocking pool.
pub async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || crewdesk_auth::hash_password(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

pub async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || crewdesk_auth::verify_password(&password, &hash))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}
