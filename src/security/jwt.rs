use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::{Claims, TokenValidator};

/// Failure to issue or read a token.
#[derive(Debug)]
pub enum SecurityError {
    Encode(jsonwebtoken::errors::Error),
    Decode(jsonwebtoken::errors::Error),
    /// The token decoded, but its payload is not a JSON object
    NotAnObject,
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityError::Encode(e) => write!(f, "failed to sign token: {e}"),
            SecurityError::Decode(e) => write!(f, "invalid token: {e}"),
            SecurityError::NotAnObject => f.write_str("token payload is not a JSON object"),
        }
    }
}

impl std::error::Error for SecurityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SecurityError::Encode(e) | SecurityError::Decode(e) => Some(e),
            SecurityError::NotAnObject => None,
        }
    }
}

/// HS256 token issuer and validator sharing one secret.
///
/// `exp` is optional: tokens without it never expire, tokens with it are
/// rejected once it has passed. [`JwtCodec::with_ttl`] stamps `exp` on every
/// issued token.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl JwtCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: None,
        }
    }

    /// Issue tokens that expire `ttl` after signing.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sign `claims`, which must serialize to a JSON object.
    ///
    /// # Errors
    ///
    /// [`SecurityError::NotAnObject`] for non-object claims,
    /// [`SecurityError::Encode`] when signing fails.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, SecurityError> {
        let value = serde_json::to_value(claims)
            .map_err(|e| SecurityError::Encode(jsonwebtoken::errors::Error::from(e)))?;
        let Value::Object(mut map) = value else {
            return Err(SecurityError::NotAnObject);
        };
        if let Some(ttl) = self.ttl {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            map.insert("exp".to_string(), Value::from((now + ttl).as_secs()));
        }
        jsonwebtoken::encode(&Header::default(), &map, &self.encoding)
            .map_err(SecurityError::Encode)
    }

    /// Verify the signature (and `exp`, when present) and return the claims.
    ///
    /// # Errors
    ///
    /// [`SecurityError::Decode`] for a bad signature, malformed or expired
    /// token, [`SecurityError::NotAnObject`] for a non-object payload.
    pub fn decode(&self, token: &str) -> Result<Claims, SecurityError> {
        let data = jsonwebtoken::decode::<Value>(token, &self.decoding, &self.validation)
            .map_err(SecurityError::Decode)?;
        match data.claims {
            Value::Object(map) => Ok(map),
            _ => Err(SecurityError::NotAnObject),
        }
    }
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenValidator for JwtCodec {
    fn validate(&self, token: &str) -> Option<Claims> {
        match self.decode(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(error = %e, "Rejected bearer token");
                None
            }
        }
    }
}
