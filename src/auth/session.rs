//! In-memory session store
//!
//! Maps session tokens to the authenticated username. Only a SHA-256
//! digest of each token is kept, so a dump of the map cannot be replayed as
//! cookies. Sessions are ephemeral and lost on server restart.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::UserRecord;

const TOKEN_BYTES: usize = 32;

/// Resolves a principal back to its user record with a fresh query.
#[async_trait]
pub trait UserLoader: Send + Sync {
    async fn load_user(&self, username: &str) -> Option<UserRecord>;
}

/// Opaque session token as carried in the session cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
    loader: Arc<dyn UserLoader>,
}

impl SessionManager {
    pub fn new(ttl: Duration, loader: Arc<dyn UserLoader>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            loader,
        }
    }

    /// Start a session for `username` and return the token to hand out.
    pub async fn login(&self, username: &str) -> SessionToken {
        let token = SessionToken::generate();
        let now = Utc::now();
        let entry = SessionEntry {
            username: username.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions.write().await.insert(token_key(token.as_str()), entry);
        debug!("Session opened for {}", username);
        token
    }

    /// Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) {
        if let Some(entry) = self.sessions.write().await.remove(&token_key(token)) {
            debug!(
                "Session closed for {} after {}s",
                entry.username,
                (Utc::now() - entry.created_at).num_seconds()
            );
        }
    }

    pub async fn current_user(&self, token: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(&token_key(token))?;
        if entry.is_expired(Utc::now()) {
            return None;
        }
        Some(entry.username.clone())
    }

    /// The session's user as it exists in the store right now.
    pub async fn load_user(&self, token: &str) -> Option<UserRecord> {
        let username = self.current_user(token).await?;
        self.loader.load_user(&username).await
    }

    /// Drop expired sessions, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now));
        before - sessions.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn token_key(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}
