//! Authentication module for the bank auth server
//!
//! Password hashing, the credential store, cookie sessions and the
//! login/register/logout handlers.

pub mod credentials;
pub mod extract;
pub mod handlers;
pub mod password;
mod rate_limit;
pub mod session;
mod service;

pub use credentials::{CredentialStore, NewUser};
pub use extract::{CurrentUser, Principal};
pub use password::{Argon2Hasher, PasswordHasher};
pub use rate_limit::{LoginThrottle, LoginThrottleConfig};
pub use service::AuthService;
pub use session::{SessionManager, SessionToken, UserLoader};
