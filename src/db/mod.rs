//! User store for the bank auth server
//!
//! One record per user keyed by username. The `UserStore` trait is the raw
//! document backend; hashing and validation live in `auth::CredentialStore`.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::InMemoryUserStore;
pub use models::UserRecord;
pub use postgres::PgUserStore;
pub use store::UserStore;
