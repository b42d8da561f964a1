use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored user. `password_hash` is a PHC string, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub email: String,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            email: email.into(),
        }
    }
}
