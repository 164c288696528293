//! Bearer token validation for the presence gate.

pub mod jwt;

pub use jwt::{Claims, JwtIdentityResolver};
