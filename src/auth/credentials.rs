use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::error;

use crate::auth::password::PasswordHasher;
use crate::auth::session::UserLoader;
use crate::db::{UserRecord, UserStore};
use crate::error::{AppError, AuthError, DatabaseError};

/// Hashed once with the configured cost, then verified against whenever the
/// username is unknown so both failure paths do the same Argon2 work.
const DUMMY_PASSWORD: &str = "unknown-user-placeholder";

/// Fields submitted on registration.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl NewUser<'_> {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.username.trim().is_empty() {
            return Err(AppError::ValidationError("Username is required".into()));
        }
        if self.email.trim().is_empty() {
            return Err(AppError::ValidationError("Email is required".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::ValidationError("Password is required".into()));
        }
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
            _ => Err(AppError::ValidationError("Email address is not valid".into())),
        }
    }
}

/// User records plus the hashing that guards them. Plaintext passwords go in,
/// only digests are stored.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_digest: Arc<OnceCell<String>>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            store,
            hasher,
            dummy_digest: Arc::new(OnceCell::new()),
        }
    }

    pub async fn insert(&self, user: NewUser<'_>) -> Result<(), AppError> {
        user.validate()?;

        let digest = self.hash(user.password).await?;
        let record = UserRecord::new(user.username, user.email, digest);

        match self.store.insert(&record).await {
            Ok(()) => Ok(()),
            Err(DatabaseError::Duplicate) => Err(AuthError::DuplicateUsername.into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.store.find_by_username(username).await?)
    }

    pub async fn delete_by_username(&self, username: &str) -> Result<(), AppError> {
        Ok(self.store.delete_by_username(username).await?)
    }

    /// The user's record when `password` matches its stored digest.
    ///
    /// Unknown user and wrong password both come back as
    /// `AuthError::InvalidCredentials`.
    pub async fn verify(&self, username: &str, password: &str) -> Result<UserRecord, AppError> {
        let Some(user) = self.find_by_username(username).await? else {
            let digest = self.dummy_digest().await?;
            self.check_password(password, digest).await?;
            return Err(AuthError::InvalidCredentials.into());
        };

        if self.check_password(password, user.password_hash.clone()).await? {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials.into())
        }
    }

    pub async fn close(&self) {
        self.store.close().await;
    }

    async fn hash(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let plaintext = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await?
    }

    async fn check_password(&self, password: &str, digest: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        let plaintext = password.to_string();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest)).await?)
    }

    async fn dummy_digest(&self) -> Result<String, AppError> {
        self.dummy_digest
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD))
            .await
            .cloned()
    }
}

#[async_trait]
impl UserLoader for CredentialStore {
    async fn load_user(&self, username: &str) -> Option<UserRecord> {
        match self.store.find_by_username(username).await {
            Ok(user) => user,
            Err(e) => {
                error!("Failed to load session user {}: {}", username, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{Argon2Hasher, MockPasswordHasher};
    use crate::db::store::MockUserStore;
    use crate::db::InMemoryUserStore;

    fn credentials() -> (CredentialStore, InMemoryUserStore) {
        let store = InMemoryUserStore::new();
        let hasher = Argon2Hasher::new(1024, 1, 1).unwrap();
        (CredentialStore::new(Arc::new(store.clone()), Arc::new(hasher)), store)
    }

    fn testuser() -> NewUser<'static> {
        NewUser {
            username: "testuser",
            email: "test@example.com",
            password: "testpass",
        }
    }

    #[tokio::test]
    async fn test_insert_stores_digest_not_plaintext() {
        let (credentials, store) = credentials();
        credentials.insert(testuser()).await.unwrap();

        let stored = store.find_by_username("testuser").await.unwrap().unwrap();
        assert_eq!(stored.email, "test@example.com");
        assert_ne!(stored.password_hash, "testpass");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (credentials, store) = credentials();
        credentials.insert(testuser()).await.unwrap();

        let result = credentials
            .insert(NewUser {
                email: "other@example.com",
                ..testuser()
            })
            .await;

        assert!(matches!(result, Err(AppError::AuthError(AuthError::DuplicateUsername))));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let (credentials, store) = credentials();

        for user in [
            NewUser { username: "", ..testuser() },
            NewUser { username: "   ", ..testuser() },
            NewUser { email: "", ..testuser() },
            NewUser { password: "", ..testuser() },
            NewUser { email: "not-an-email", ..testuser() },
            NewUser { email: "@example.com", ..testuser() },
        ] {
            let result = credentials.insert(user.clone()).await;
            assert!(matches!(result, Err(AppError::ValidationError(_))), "accepted {:?}", user);
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_verify_outcomes() {
        let (credentials, _) = credentials();
        credentials.insert(testuser()).await.unwrap();

        let user = credentials.verify("testuser", "testpass").await.unwrap();
        assert_eq!(user.username, "testuser");

        let wrong = credentials.verify("testuser", "wrongpass").await;
        let unknown = credentials.verify("nobody", "testpass").await;
        // Indistinguishable to the caller.
        assert!(matches!(wrong, Err(AppError::AuthError(AuthError::InvalidCredentials))));
        assert!(matches!(unknown, Err(AppError::AuthError(AuthError::InvalidCredentials))));
    }

    #[tokio::test]
    async fn test_delete_then_login_fails() {
        let (credentials, _) = credentials();
        credentials.insert(testuser()).await.unwrap();

        credentials.delete_by_username("testuser").await.unwrap();
        credentials.delete_by_username("testuser").await.unwrap();

        assert!(credentials.verify("testuser", "testpass").await.is_err());
        assert!(credentials.load_user("testuser").await.is_none());
    }

    #[tokio::test]
    async fn test_store_outage_surfaces() {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_username()
            .returning(|_| Err(DatabaseError::ConnectionError("connection refused".into())));
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().never();

        let credentials = CredentialStore::new(Arc::new(store), Arc::new(hasher));
        let result = credentials.verify("testuser", "testpass").await;

        assert!(result.unwrap_err().is_store_unavailable());
        assert!(credentials.load_user("testuser").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_user_still_runs_password_check() {
        let mut store = MockUserStore::new();
        store.expect_find_by_username().returning(|_| Ok(None));
        let mut hasher = MockPasswordHasher::new();
        // The placeholder digest is computed once and reused.
        hasher
            .expect_hash()
            .times(1)
            .returning(|_| Ok("$argon2id$placeholder".to_string()));
        hasher
            .expect_verify()
            .times(2)
            .returning(|_, digest| {
                assert_eq!(digest, "$argon2id$placeholder");
                false
            });

        let credentials = CredentialStore::new(Arc::new(store), Arc::new(hasher));

        for _ in 0..2 {
            let result = credentials.verify("ghost", "testpass").await;
            assert!(matches!(result, Err(AppError::AuthError(AuthError::InvalidCredentials))));
        }
    }
}
