//! `orderdesk-auth` — authentication boundary (retailer identity).
//!
//! This crate is intentionally decoupled from HTTP and storage. It models the
//! claims a retailer dashboard token carries and verifies HS256 signatures;
//! session issuance lives with an external collaborator.

pub mod claims;
pub mod validator;

pub use claims::{JwtClaims, PrincipalId, TokenValidationError, validate_claims};
pub use validator::{Hs256JwtValidator, JwtValidator};
