use crate::application_port::TokenError;
use crate::domain_model::SubjectId;

/// One session record per subject: the hash of the current live refresh
/// token. No history, no secondary indexes.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Replace-or-insert the record for `subject`, atomically from the
    /// caller's point of view. `ttl_secs` bounds the record's lifetime to
    /// the refresh token's own expiry.
    async fn upsert(
        &self,
        subject: SubjectId,
        secret_hash: &str,
        ttl_secs: u64,
    ) -> Result<(), TokenError>;
    /// `Ok(None)` when the subject has no live session; this is the
    /// expected outcome for a subject that never logged in or was rotated
    /// away concurrently. `Err` only for store failures.
    async fn lookup(&self, subject: SubjectId) -> Result<Option<String>, TokenError>;
}
