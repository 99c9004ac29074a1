//! Session orchestration
//!
//! Composes the credential hasher, the access token codec, the refresh
//! token store, and the header extractor into the login / authenticate /
//! refresh / revoke flows. Every other endpoint leans on this service for
//! its authorization decision.
//!
//! Refresh tokens deliberately do not rotate on use: one refresh token may
//! mint many access tokens until it expires or is explicitly revoked.
//! Callers needing rotation semantics revoke explicitly after refreshing.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::extract::{self, AuthHeaderError};
use super::jwt::{JwtCodec, JwtError};
use super::password::{verify_password, PasswordError};
use super::store::{
    generate_refresh_token, CredentialStore, RefreshTokenStore, StoreError,
};

/// Tokens handed to a client on successful login
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Authentication/authorization failure taxonomy
///
/// The variants carry the internal distinctions for logging; the HTTP
/// layer collapses everything except `Forbidden` and the store/internal
/// cases into one generic unauthorized response.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Malformed authorization header: {0}")]
    MalformedAuthHeader(#[from] AuthHeaderError),
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token has been revoked")]
    TokenRevoked,
    #[error("Token not found")]
    TokenNotFound,
    #[error("Invalid token signature")]
    SignatureInvalid,
    #[error("Invalid API key")]
    ApiKeyInvalid,
    #[error("Not the resource owner")]
    Forbidden,
    #[error("Store unavailable: {0}")]
    Store(String),
    #[error("Internal auth failure: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err.0)
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            // Malformed tokens and bad signatures are the same outcome;
            // the distinction only matters in logs
            JwtError::InvalidSignature | JwtError::Malformed => AuthError::SignatureInvalid,
            JwtError::Encoding(msg) => AuthError::Internal(msg),
        }
    }
}

/// Session lifecycle orchestrator
///
/// Generic over the store contracts so the state machine can be tested
/// against an in-memory double. Carries no mutable state of its own: the
/// revocation/expiry truth lives in the store.
#[derive(Clone)]
pub struct SessionService<S> {
    store: S,
    codec: JwtCodec,
    webhook_api_key: String,
    refresh_window: Duration,
}

impl<S> SessionService<S>
where
    S: CredentialStore + RefreshTokenStore + Sync,
{
    pub fn new(store: S, codec: JwtCodec, webhook_api_key: String, refresh_ttl_days: i64) -> Self {
        Self {
            store,
            codec,
            webhook_api_key,
            refresh_window: Duration::days(refresh_ttl_days),
        }
    }

    pub fn codec(&self) -> &JwtCodec {
        &self.codec
    }

    /// Verify credentials and issue an access + refresh token pair
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller; only the logs say which check failed.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        requested_ttl_secs: Option<i64>,
    ) -> Result<TokenPair, AuthError> {
        let credential = self
            .store
            .credential_by_email(email)
            .await?
            .ok_or_else(|| {
                tracing::warn!(email = %email, "login: unknown email");
                AuthError::InvalidCredentials
            })?;

        match verify_password(password, &credential.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(user_id = %credential.user_id, "login: password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            Err(PasswordError::InvalidHash(msg)) | Err(PasswordError::Hashing(msg)) => {
                // A corrupt stored hash is an internal problem, not bad credentials
                tracing::error!(user_id = %credential.user_id, error = %msg, "login: hash verification error");
                return Err(AuthError::Internal(msg));
            }
        }

        let access_token = self.codec.issue(credential.user_id, requested_ttl_secs)?;

        let refresh_token = generate_refresh_token();
        let expires_at = OffsetDateTime::now_utc() + self.refresh_window;
        self.store
            .create(&refresh_token, credential.user_id, expires_at)
            .await?;

        tracing::info!(user_id = %credential.user_id, "login: session established");

        Ok(TokenPair {
            user_id: credential.user_id,
            access_token,
            refresh_token,
        })
    }

    /// Authenticate a request from its bearer access token
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let token = extract::bearer_token(headers)?;
        Ok(self.codec.validate(token)?)
    }

    /// Mint a new access token from a bearer refresh token
    ///
    /// The refresh token is not consumed; it stays valid until it expires
    /// or is revoked.
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let token = extract::bearer_token(headers)?;

        let record = self
            .store
            .find(token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let now = OffsetDateTime::now_utc();
        if now >= record.expires_at {
            tracing::warn!(user_id = %record.user_id, "refresh: token expired");
            return Err(AuthError::TokenExpired);
        }
        if record.revoked_at.is_some() {
            tracing::warn!(user_id = %record.user_id, "refresh: token revoked");
            return Err(AuthError::TokenRevoked);
        }

        Ok(self.codec.issue(record.user_id, None)?)
    }

    /// Revoke a bearer refresh token
    ///
    /// One-way transition. Revoking an unknown or already-revoked token is
    /// a `TokenNotFound` failure so callers can tell "revoked" from
    /// "nothing to revoke".
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let token = extract::bearer_token(headers)?;

        if self.store.mark_revoked(token).await? {
            tracing::info!("revoke: refresh token revoked");
            Ok(())
        } else {
            Err(AuthError::TokenNotFound)
        }
    }

    /// Ownership check for identity-scoped operations
    ///
    /// `Forbidden` is distinct from the unauthorized used for
    /// authentication failures: the caller is logged in, just not the owner.
    pub fn authorize_owner(&self, subject: Uuid, resource_owner: Uuid) -> Result<(), AuthError> {
        if subject == resource_owner {
            Ok(())
        } else {
            tracing::warn!(
                subject = %subject,
                owner = %resource_owner,
                "ownership check failed"
            );
            Err(AuthError::Forbidden)
        }
    }

    /// Verify the static API key gating the membership webhook
    pub fn verify_api_key(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let key = extract::api_key(headers)?;

        if constant_time_compare(key, &self.webhook_api_key) {
            Ok(())
        } else {
            tracing::warn!("webhook API key mismatch");
            Err(AuthError::ApiKeyInvalid)
        }
    }

    /// Administrative purge of all refresh tokens
    pub async fn purge_refresh_tokens(&self) -> Result<u64, AuthError> {
        Ok(self.store.delete_all().await?)
    }
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        // Do a dummy comparison to avoid length-based timing attacks
        let dummy = vec![0u8; a.len()];
        let _ = a.as_bytes().ct_eq(&dummy);
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::auth::store::{Credential, RefreshTokenRecord};
    use axum::http::{header, HeaderValue};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const SECRET: &str = "test-secret-key-at-least-32-chars!";
    const API_KEY: &str = "webhook-key";

    /// In-memory double for both store contracts
    #[derive(Default)]
    struct MemStore {
        credentials: Mutex<HashMap<String, Credential>>,
        tokens: Mutex<HashMap<String, RefreshTokenRecord>>,
    }

    impl MemStore {
        fn with_user(email: &str, password: &str) -> (Self, Uuid) {
            let store = Self::default();
            let user_id = Uuid::new_v4();
            store.credentials.lock().unwrap().insert(
                email.to_string(),
                Credential {
                    user_id,
                    password_hash: hash_password(password).unwrap(),
                },
            );
            (store, user_id)
        }

        fn insert_token(&self, record: RefreshTokenRecord) {
            self.tokens
                .lock()
                .unwrap()
                .insert(record.token.clone(), record);
        }
    }

    impl CredentialStore for MemStore {
        async fn credential_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError> {
            Ok(self.credentials.lock().unwrap().get(email).cloned())
        }
    }

    impl RefreshTokenStore for MemStore {
        async fn create(
            &self,
            token: &str,
            user_id: Uuid,
            expires_at: OffsetDateTime,
        ) -> Result<(), StoreError> {
            self.insert_token(RefreshTokenRecord {
                token: token.to_string(),
                user_id,
                expires_at,
                revoked_at: None,
            });
            Ok(())
        }

        async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
            Ok(self.tokens.lock().unwrap().get(token).cloned())
        }

        async fn mark_revoked(&self, token: &str) -> Result<bool, StoreError> {
            let mut tokens = self.tokens.lock().unwrap();
            match tokens.get_mut(token) {
                Some(record) if record.revoked_at.is_none() => {
                    record.revoked_at = Some(OffsetDateTime::now_utc());
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn delete_all(&self) -> Result<u64, StoreError> {
            let mut tokens = self.tokens.lock().unwrap();
            let count = tokens.len() as u64;
            tokens.clear();
            Ok(count)
        }
    }

    fn service(store: MemStore) -> SessionService<MemStore> {
        SessionService::new(store, JwtCodec::new(SECRET, 3600), API_KEY.to_string(), 60)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn api_key_header(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("ApiKey {key}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_login_issues_usable_token_pair() {
        let (store, user_id) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        let pair = svc
            .login("jay@example.com", "hunter2hunter2", None)
            .await
            .expect("login failed");

        assert_eq!(pair.user_id, user_id);
        assert_eq!(pair.refresh_token.len(), 64);

        // The access token authenticates subsequent requests
        let subject = svc.authenticate(&bearer(&pair.access_token)).unwrap();
        assert_eq!(subject, user_id);
    }

    #[tokio::test]
    async fn test_login_failures_are_generic() {
        let (store, _) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        // Unknown email and wrong password produce the same variant
        let unknown = svc.login("nobody@example.com", "whatever", None).await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

        let wrong = svc.login("jay@example.com", "not-the-password", None).await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_with_corrupt_hash_is_internal_not_unauthorized() {
        let store = MemStore::default();
        store.credentials.lock().unwrap().insert(
            "jay@example.com".to_string(),
            Credential {
                user_id: Uuid::new_v4(),
                password_hash: "garbage".to_string(),
            },
        );
        let svc = service(store);

        let result = svc.login("jay@example.com", "hunter2hunter2", None).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[tokio::test]
    async fn test_refresh_succeeds_repeatedly_until_revoked() {
        let (store, user_id) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        let pair = svc
            .login("jay@example.com", "hunter2hunter2", None)
            .await
            .unwrap();
        let headers = bearer(&pair.refresh_token);

        // Non-rotating: the same refresh token mints access tokens repeatedly
        for _ in 0..3 {
            let access = svc.refresh(&headers).await.expect("refresh failed");
            assert_eq!(svc.authenticate(&bearer(&access)).unwrap(), user_id);
        }

        svc.revoke(&headers).await.expect("revoke failed");

        // Revoked: refresh now fails, and re-revoking reports nothing to revoke
        assert!(matches!(
            svc.refresh(&headers).await,
            Err(AuthError::TokenRevoked)
        ));
        assert!(matches!(
            svc.revoke(&headers).await,
            Err(AuthError::TokenNotFound)
        ));
    }

    #[tokio::test]
    async fn test_refresh_unknown_token() {
        let (store, _) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        let result = svc.refresh(&bearer("deadbeef")).await;
        assert!(matches!(result, Err(AuthError::TokenNotFound)));
    }

    #[tokio::test]
    async fn test_refresh_expired_token() {
        let (store, _) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let user_id = Uuid::new_v4();
        store.insert_token(RefreshTokenRecord {
            token: "expired-token".to_string(),
            user_id,
            expires_at: OffsetDateTime::now_utc() - Duration::days(1),
            revoked_at: None,
        });
        let svc = service(store);

        let result = svc.refresh(&bearer("expired-token")).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_revocation_does_not_invalidate_outstanding_access_tokens() {
        let (store, user_id) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        let pair = svc
            .login("jay@example.com", "hunter2hunter2", None)
            .await
            .unwrap();
        svc.revoke(&bearer(&pair.refresh_token)).await.unwrap();

        // Stateless access tokens survive refresh-token revocation until
        // their own expiry
        let subject = svc.authenticate(&bearer(&pair.access_token)).unwrap();
        assert_eq!(subject, user_id);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_tokens() {
        let (store, _) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        assert!(matches!(
            svc.authenticate(&HeaderMap::new()),
            Err(AuthError::MalformedAuthHeader(AuthHeaderError::Missing))
        ));
        assert!(matches!(
            svc.authenticate(&bearer("not.a.jwt")),
            Err(AuthError::SignatureInvalid)
        ));

        // Token signed under a different secret
        let other = JwtCodec::new("another-secret-also-32-chars-long!!", 3600);
        let forged = other.issue(Uuid::new_v4(), None).unwrap();
        assert!(matches!(
            svc.authenticate(&bearer(&forged)),
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn test_ownership_check() {
        let (store, _) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(svc.authorize_owner(a, a).is_ok());
        assert!(matches!(
            svc.authorize_owner(a, b),
            Err(AuthError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_webhook_api_key() {
        let (store, _) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        assert!(svc.verify_api_key(&api_key_header(API_KEY)).is_ok());
        assert!(svc.verify_api_key(&bearer(API_KEY)).is_err());

        // A key mismatch is its own failure, not a login-credential error,
        // so the caller never sees a password-flavored message
        assert!(matches!(
            svc.verify_api_key(&api_key_header("wrong-key")),
            Err(AuthError::ApiKeyInvalid)
        ));
    }

    #[tokio::test]
    async fn test_purge_deletes_everything() {
        let (store, _) = MemStore::with_user("jay@example.com", "hunter2hunter2");
        let svc = service(store);

        svc.login("jay@example.com", "hunter2hunter2", None)
            .await
            .unwrap();
        svc.login("jay@example.com", "hunter2hunter2", None)
            .await
            .unwrap();

        assert_eq!(svc.purge_refresh_tokens().await.unwrap(), 2);
        assert_eq!(svc.purge_refresh_tokens().await.unwrap(), 0);
    }
}
