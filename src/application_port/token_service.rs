use crate::domain_model::SubjectId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Externally visible failure taxonomy of the token lifecycle.
///
/// Every credential-validity failure collapses into `CredentialInvalid` so a
/// caller cannot tell a tampered signature from an unknown subject or an
/// already-rotated token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token encoding")]
    InputMalformed,
    #[error("refresh token is invalid, expired, or revoked")]
    CredentialInvalid,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Codec-level verification failures, collapsed by the lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("signature or algorithm rejected")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token claims malformed")]
    Malformed,
    #[error("subject claim missing or not a valid identifier")]
    MissingSubject,
    #[error("signing failed: {0}")]
    Signing(String),
}

impl From<CodecError> for TokenError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Signing(e) => TokenError::Internal(e),
            _ => TokenError::CredentialInvalid,
        }
    }
}

/// Short-lived bearer credential, transmitted as the bare signed compact form.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

/// Longer-lived rotating bearer credential. The codec produces the signed
/// compact form; the lifecycle manager hands the client a base64 wrapping
/// of it (transport encoding, not secrecy).
#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenVerifyResult {
    pub subject: SubjectId,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn mint_access(
        &self,
        subject: SubjectId,
    ) -> Result<(AccessToken, DateTime<Utc>), CodecError>;
    async fn mint_refresh(
        &self,
        subject: SubjectId,
    ) -> Result<(RefreshToken, DateTime<Utc>), CodecError>;
    async fn verify_access(&self, token: &str) -> Result<TokenVerifyResult, CodecError>;
    async fn verify_refresh(&self, token: &str) -> Result<TokenVerifyResult, CodecError>;
}

/// One-way hashing of refresh-token bytes for at-rest storage.
#[async_trait::async_trait]
pub trait SecretHasher: Send + Sync {
    /// Salted adaptive-cost hash. Equal inputs hash to different outputs on
    /// every call; each output verifies against the original input.
    async fn hash(&self, secret: &[u8]) -> Result<String, TokenError>;
    /// `Ok(false)` on mismatch. `Err` is reserved for infrastructure
    /// problems such as an unreadable stored hash.
    async fn verify(&self, hash: &str, candidate: &[u8]) -> Result<bool, TokenError>;
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    /// Mint a fresh access/refresh pair for `subject` and install the hash
    /// of the new refresh token as the subject's single live session,
    /// overwriting whatever was there.
    async fn issue(&self, subject: SubjectId) -> Result<TokenPair, TokenError>;
    /// Validate a presented refresh token (encoding, signature, expiry,
    /// stored-hash match) and rotate: the presented token stops working and
    /// a brand-new pair is returned.
    async fn refresh(&self, presented: &str) -> Result<TokenPair, TokenError>;
}
