//! Access token issuance and validation
//!
//! Access tokens are stateless HS256 JWTs carrying the subject identity.
//! Nothing is persisted: validity is recomputed on every use from the
//! signature and the timestamps, which is the deliberate trade-off of
//! short-lived tokens (there is no revocation list).

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

const ISSUER: &str = "chirp";

/// Claims carried by a Chirp access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer, always "chirp"
    pub iss: String,
    /// Subject (user ID)
    pub sub: Uuid,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Stateless codec for signed access tokens
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    max_ttl_secs: i64,
}

impl JwtCodec {
    pub fn new(secret: &str, max_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            max_ttl_secs,
        }
    }

    /// Maximum access token lifetime in seconds
    pub fn max_ttl_secs(&self) -> i64 {
        self.max_ttl_secs
    }

    /// Clamp a requested lifetime to the configured maximum
    ///
    /// A request inside (0, max) is honored; anything else (absent, zero,
    /// negative, or over the cap) falls back to the maximum. Callers can
    /// shorten a token's life but never extend it.
    pub fn clamp_ttl(&self, requested_secs: Option<i64>) -> i64 {
        match requested_secs {
            Some(secs) if secs > 0 && secs < self.max_ttl_secs => secs,
            _ => self.max_ttl_secs,
        }
    }

    /// Issue a signed access token for the given subject
    pub fn issue(&self, user_id: Uuid, requested_ttl_secs: Option<i64>) -> Result<String, JwtError> {
        let ttl = self.clamp_ttl(requested_ttl_secs);
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: user_id,
            iat: now,
            exp: now + ttl,
        };

        // Explicit algorithm prevents algorithm confusion attacks
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Validate a token and return its subject
    ///
    /// Fails closed: any signature, expiry, or decode problem is an error.
    /// The variants are distinguished for logging only; the HTTP layer
    /// collapses them all to a single unauthorized outcome.
    pub fn validate(&self, token: &str) -> Result<Uuid, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock-skew leeway: a token is invalid the instant now >= exp
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::Malformed,
            }
        })?;

        // The library only rejects exp < now; the expiry boundary itself is
        // ours to enforce, matching the refresh-token rule (dead at now == exp)
        if OffsetDateTime::now_utc().unix_timestamp() >= data.claims.exp {
            return Err(JwtError::Expired);
        }

        Ok(data.claims.sub)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Malformed token")]
    Malformed,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-chars!";

    #[test]
    fn test_issue_and_validate_round_trip() {
        let codec = JwtCodec::new(SECRET, 3600);
        let user_id = Uuid::new_v4();

        let token = codec.issue(user_id, None).expect("Failed to issue token");
        let subject = codec.validate(&token).expect("Invalid token");
        assert_eq!(subject, user_id);
    }

    #[test]
    fn test_ttl_clamping() {
        let codec = JwtCodec::new(SECRET, 3600);

        // Shorter lifetimes are honored
        assert_eq!(codec.clamp_ttl(Some(600)), 600);
        assert_eq!(codec.clamp_ttl(Some(1)), 1);

        // Absent, zero, negative, or over-cap requests get the maximum
        assert_eq!(codec.clamp_ttl(None), 3600);
        assert_eq!(codec.clamp_ttl(Some(0)), 3600);
        assert_eq!(codec.clamp_ttl(Some(-5)), 3600);
        assert_eq!(codec.clamp_ttl(Some(3600)), 3600);
        assert_eq!(codec.clamp_ttl(Some(86400)), 3600);
    }

    #[test]
    fn test_wrong_secret_fails_with_bad_signature() {
        let codec = JwtCodec::new(SECRET, 3600);
        let other = JwtCodec::new("another-secret-also-32-chars-long!!", 3600);

        let token = codec.issue(Uuid::new_v4(), None).expect("Failed to issue");
        assert_eq!(other.validate(&token), Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_fails_with_expired() {
        let codec = JwtCodec::new(SECRET, 3600);
        let now = OffsetDateTime::now_utc().unix_timestamp();

        // Forge a token whose exp is already in the past, signed with the
        // same secret, to avoid sleeping in tests
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: Uuid::new_v4(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.validate(&token), Err(JwtError::Expired));
    }

    #[test]
    fn test_token_dead_at_expiry_instant() {
        let codec = JwtCodec::new(SECRET, 3600);
        let now = OffsetDateTime::now_utc().unix_timestamp();

        // exp == now must already fail; validity is strictly now < exp
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: Uuid::new_v4(),
            iat: now - 3600,
            exp: now,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.validate(&token), Err(JwtError::Expired));
    }

    #[test]
    fn test_garbage_token_fails_with_malformed() {
        let codec = JwtCodec::new(SECRET, 3600);
        assert_eq!(codec.validate("not.a.jwt"), Err(JwtError::Malformed));
        assert_eq!(codec.validate(""), Err(JwtError::Malformed));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let codec = JwtCodec::new(SECRET, 3600);
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let claims = Claims {
            iss: "someone-else".to_string(),
            sub: Uuid::new_v4(),
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(codec.validate(&token).is_err());
    }
}
