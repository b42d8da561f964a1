pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod templates;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{Argon2Hasher, AuthService, CredentialStore, PasswordHasher, SessionManager};
pub use db::{InMemoryUserStore, PgUserStore, UserRecord, UserStore};

use auth::handlers;
use crate::config::StoreBackend;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "active_sessions": state.auth_service.sessions().session_count().await,
    }))
}

/// Every route the server exposes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(health_check))
        .route("/login", web::get().to(handlers::login_page))
        .route("/login", web::post().to(handlers::login))
        .route("/register", web::get().to(handlers::register_page))
        .route("/register", web::post().to(handlers::register))
        .route("/logout", web::get().to(handlers::logout))
        .route("/logout", web::post().to(handlers::logout))
        .route("/home", web::get().to(handlers::home));
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        let store: Arc<dyn UserStore> = match config.database.backend {
            StoreBackend::Postgres => Arc::new(PgUserStore::connect(&config.database).await?),
            StoreBackend::Memory => Arc::new(InMemoryUserStore::new()),
        };
        let hasher = Argon2Hasher::from_config(&config.auth)?;

        Ok(Self::from_parts(config, store, Arc::new(hasher)))
    }

    /// Build the state around an existing store and hasher.
    pub fn from_parts(
        config: Settings,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let auth_service = AuthService::new(&config, store, hasher);
        Self {
            config: Arc::new(config),
            auth_service: Arc::new(auth_service),
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.auth_service.shutdown().await;
        Ok(())
    }
}
