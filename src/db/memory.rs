use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::models::UserRecord;
use crate::db::store::UserStore;
use crate::error::DatabaseError;

/// Process-local user store. Records are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        // Check and insert under one write guard.
        let mut users = self.users.write().await;
        match users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(DatabaseError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn delete_by_username(&self, username: &str) -> Result<(), DatabaseError> {
        self.users.write().await.remove(username);
        Ok(())
    }
}
