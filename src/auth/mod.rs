//! Authentication and roles for report callers
//!
//! Provides:
//! - The closed `Role` set and the `User` the access rules operate on
//! - JWT token generation and validation

pub mod jwt;
pub mod roles;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use roles::{Role, User};
