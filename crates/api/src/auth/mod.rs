//! Authentication and session lifecycle for Chirp

pub mod extract;
pub mod jwt;
pub mod password;
pub mod session;
pub mod store;

pub use extract::AuthHeaderError;
pub use jwt::{Claims, JwtCodec, JwtError};
pub use password::{hash_password, verify_password, PasswordError};
pub use session::{AuthError, SessionService, TokenPair};
pub use store::{CredentialStore, PgAuthStore, RefreshTokenStore, StoreError};
