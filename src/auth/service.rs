use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use crate::auth::credentials::{CredentialStore, NewUser};
use crate::auth::password::PasswordHasher;
use crate::auth::rate_limit::{LoginThrottle, LoginThrottleConfig};
use crate::auth::session::{SessionManager, SessionToken};
use crate::config::Settings;
use crate::db::{UserRecord, UserStore};
use crate::error::{AppError, AuthError};

/// Register and login pipelines over the credential store and sessions.
pub struct AuthService {
    credentials: CredentialStore,
    sessions: SessionManager,
    throttle: LoginThrottle,
}

impl AuthService {
    pub fn new(
        config: &Settings,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let credentials = CredentialStore::new(store, hasher);
        let sessions = SessionManager::new(
            Duration::minutes(config.session.ttl_minutes),
            Arc::new(credentials.clone()),
        );
        let throttle = LoginThrottle::new(LoginThrottleConfig::from(&config.auth));

        Self {
            credentials,
            sessions,
            throttle,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<(), AppError> {
        self.credentials
            .insert(NewUser {
                username,
                email,
                password,
            })
            .await?;
        info!("Registered user {}", username);
        Ok(())
    }

    /// Verify the password and open a session. `client` identifies the
    /// caller for failed-attempt throttling: every attempt takes a slot up
    /// front and only a successful login gives them back.
    pub async fn login(&self, username: &str, password: &str, client: &str) -> Result<SessionToken, AppError> {
        if !self.throttle.try_begin(client).await {
            warn!("Login throttled for client {}", client);
            return Err(AuthError::RateLimited.into());
        }

        match self.credentials.verify(username, password).await {
            Ok(user) => {
                self.throttle.reset(client).await;
                let token = self.sessions.login(&user.username).await;
                info!("Login successful for {}", user.username);
                Ok(token)
            }
            Err(AppError::AuthError(AuthError::InvalidCredentials)) => {
                warn!("Login failed for {} from {}", username, client);
                Err(AuthError::InvalidCredentials.into())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.logout(token).await;
    }

    pub async fn current_user(&self, token: &str) -> Option<String> {
        self.sessions.current_user(token).await
    }

    pub async fn load_user(&self, token: &str) -> Option<UserRecord> {
        self.sessions.load_user(token).await
    }

    /// Periodic housekeeping for expired sessions and stale throttle windows.
    pub async fn sweep(&self) -> usize {
        self.throttle.cleanup().await;
        self.sessions.cleanup_expired().await
    }

    pub async fn shutdown(&self) {
        self.credentials.close().await;
    }
}
