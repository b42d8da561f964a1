use async_trait::async_trait;

use crate::db::models::UserRecord;
use crate::error::DatabaseError;

/// Persistence for user records, keyed by username.
///
/// Implementations must enforce username uniqueness atomically: of two
/// concurrent inserts with the same username exactly one succeeds and the
/// other gets `DatabaseError::Duplicate`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &UserRecord) -> Result<(), DatabaseError>;

    /// Exact, case-sensitive match.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError>;

    /// No error when the user does not exist.
    async fn delete_by_username(&self, username: &str) -> Result<(), DatabaseError>;

    async fn close(&self) {}
}
