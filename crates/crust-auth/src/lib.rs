//! Credential handling: argon2id password hashing and HS256 bearer tokens.
//!
//! Plaintext passwords enter this crate and only hashes leave it; the rest of
//! the workspace stores and compares opaque strings.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password, HashError};
pub use token::{Claims, TokenError, TokenKeys, TOKEN_TTL_DAYS};
