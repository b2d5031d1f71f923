//! `crewdesk-auth`: customer authentication primitives.
//!
//! Token claims and their deterministic validation, HS256 signing and
//! verification, the access/refresh/reset token service, and password
//! hashing. This crate is intentionally decoupled from HTTP and storage:
//! session bookkeeping lives with the API.

pub mod claims;
pub mod error;
pub mod jwt;
pub mod password;
pub mod tokens;

pub use claims::{JwtClaims, TokenKind, TokenValidationError, validate_claims};
pub use error::AuthError;
pub use jwt::{Hs256Jwt, JwtValidator};
pub use password::{hash_password, verify_password};
pub use tokens::{TokenPair, TokenService};
