//! # Security Module
//!
//! Token validation used by [`AuthMiddleware`](crate::middleware::AuthMiddleware).
//!
//! The middleware only needs a [`TokenValidator`]: something that turns a
//! bearer token into a claim object or rejects it. [`JwtCodec`] is the
//! bundled HS256 implementation and can also issue tokens.
//!
//! ```rust
//! use oxrouter::security::{JwtCodec, TokenValidator};
//! use serde_json::json;
//!
//! let codec = JwtCodec::new("change-me");
//! let token = codec.encode(&json!({ "user_id": 1 })).unwrap();
//! let claims = codec.validate(&token).unwrap();
//! assert_eq!(claims["user_id"], 1);
//! ```

mod jwt;

pub use jwt::{JwtCodec, SecurityError};

use serde_json::{Map, Value};

/// Claim object carried by a validated token.
pub type Claims = Map<String, Value>;

/// Validates bearer tokens.
///
/// Returning `None` rejects the request with 401; implementations should log
/// the reason themselves since the caller only sees accept or reject.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Option<Claims>;
}

impl<F> TokenValidator for F
where
    F: Fn(&str) -> Option<Claims> + Send + Sync,
{
    fn validate(&self, token: &str) -> Option<Claims> {
        self(token)
    }
}
