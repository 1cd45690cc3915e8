//! # JWT Identity Provider
//!
//! Verifies HS256 bearer tokens. The `sub` claim is the user id; `exp` is
//! required, `iss` is checked when an issuer is configured.

use crate::application::ports::{Caller, IdentityError, IdentityProvider};
use crate::domain::value_objects::{Timestamp, UserId};
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The user id.
    pub sub: String,
    /// Expiry as seconds since the epoch.
    pub exp: u64,
    /// Issuer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Resolves callers from HS256-signed JWTs.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
}

impl fmt::Debug for JwtIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtIdentityProvider")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl JwtIdentityProvider {
    /// Creates a provider for the shared `secret`.
    #[must_use]
    pub fn new(secret: &[u8], issuer: Option<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(iss) = &issuer {
            validation.set_issuer(&[iss.as_str()]);
        }

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer,
        }
    }

    /// Issues a token for `user` that expires after `ttl_secs`.
    ///
    /// Used by local tooling and tests; production tokens come from the
    /// identity service sharing the secret.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if signing fails.
    pub fn issue(&self, user: &UserId, ttl_secs: i64) -> Result<String, IdentityError> {
        let exp = Timestamp::now().add_secs(ttl_secs).timestamp_secs();
        let claims = Claims {
            sub: user.as_str().to_string(),
            exp: u64::try_from(exp).unwrap_or(0),
            iss: self.issuer.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Claims, IdentityError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::InvalidToken(e.to_string()),
            })
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, token: Option<&str>) -> Result<Caller, IdentityError> {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Caller::Anonymous);
        };

        let claims = self.verify(token)?;
        if claims.sub.trim().is_empty() {
            return Err(IdentityError::InvalidToken("empty subject".to_string()));
        }
        Ok(Caller::user(claims.sub))
    }
}
