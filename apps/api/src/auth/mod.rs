//! Accounts and the bearer-token guard.

pub mod extractor;
pub mod handlers;
pub mod jwt;
pub mod password;

pub use extractor::AuthUser;
