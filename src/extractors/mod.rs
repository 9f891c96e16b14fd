//! Request extractors.

pub mod auth;
pub use auth::{sign, verify, AuthenticatedUser, Claims, JwtKeys};
