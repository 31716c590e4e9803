use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;

/// HS512 wants a key at least as long as its 512-bit output.
pub const MIN_TOKEN_KEY_BYTES: usize = 64;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// An identity that has already passed a credential check elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub unique_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub jti: Uuid,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(identity: &Identity, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: identity.user_id.clone(),
            unique_name: identity.username.clone(),
            roles: identity.roles.clone(),
            jti: Uuid::new_v4(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }
}

/// Which parts of a token the gate checks besides expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub validate_issuer_signing_key: bool,
    pub validate_issuer: bool,
    pub validate_audience: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_issuer_signing_key: true,
            validate_issuer: false,
            validate_audience: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token key not configured")]
    MissingSecret,

    #[error("Token key must be at least {MIN_TOKEN_KEY_BYTES} bytes, got {0}")]
    SecretTooShort(usize),

    #[error("Token lifetime must be a positive, representable duration")]
    InvalidLifetime,

    #[error("JWT generation error: {0}")]
    Generation(#[source] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Issues and validates bearer tokens with one symmetric key.
///
/// Built once at startup and shared behind an `Arc`; holds no mutable state.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(security: &SecurityConfig) -> Result<Self, TokenError> {
        let lifetime =
            Duration::try_days(security.token_lifetime_days).ok_or(TokenError::InvalidLifetime)?;
        Self::with_options(&security.token_key, lifetime, ValidationOptions::default())
    }

    pub fn with_options(
        secret: &str,
        lifetime: Duration,
        options: ValidationOptions,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        if secret.len() < MIN_TOKEN_KEY_BYTES {
            return Err(TokenError::SecretTooShort(secret.len()));
        }
        if lifetime <= Duration::zero() {
            return Err(TokenError::InvalidLifetime);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = options.validate_audience;
        if !options.validate_issuer {
            validation.iss = None;
        }
        if !options.validate_issuer_signing_key {
            validation.insecure_disable_signature_validation();
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
            validation,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(self.lifetime)
            .ok_or(TokenError::InvalidLifetime)?;
        let claims = Claims::new(identity, issued_at, expires_at);
        let token = self.sign(&claims)?;

        tracing::debug!(user = %identity.username, %expires_at, "issued token");

        Ok(IssuedToken { token, expires_at })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key).map_err(TokenError::Generation)
    }

    /// Checks signature and expiry, returning the decoded claims.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }
}
