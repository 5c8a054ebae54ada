use crate::application_port::TokenError;
use crate::domain_model::SubjectId;
use crate::domain_port::SessionStore;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

struct SessionRecord {
    secret_hash: String,
    expires_at: DateTime<Utc>,
}

/// Process-local backend for tests, demos, and single-node development.
/// Selected with `store.backend = "memory"`.
#[derive(Default)]
pub struct MemorySessionStore {
    records: DashMap<SubjectId, SessionRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn upsert(
        &self,
        subject: SubjectId,
        secret_hash: &str,
        ttl_secs: u64,
    ) -> Result<(), TokenError> {
        let expires_at = Utc::now() + Duration::from_secs(ttl_secs);
        self.records.insert(
            subject,
            SessionRecord {
                secret_hash: secret_hash.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn lookup(&self, subject: SubjectId) -> Result<Option<String>, TokenError> {
        if let Some(record) = self.records.get(&subject) {
            if record.expires_at > Utc::now() {
                return Ok(Some(record.secret_hash.clone()));
            }
        }
        // expired records are dropped lazily, on the next lookup
        self.records
            .remove_if(&subject, |_, record| record.expires_at <= Utc::now());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn lookup_of_unknown_subject_is_none() {
        let store = MemorySessionStore::new();
        let found = store.lookup(SubjectId(Uuid::new_v4())).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_the_single_record() {
        let store = MemorySessionStore::new();
        let subject = SubjectId(Uuid::new_v4());

        store.upsert(subject, "hash-one", 60).await.unwrap();
        store.upsert(subject, "hash-two", 60).await.unwrap();

        let found = store.lookup(subject).await.unwrap();
        assert_eq!(found.as_deref(), Some("hash-two"));
    }

    #[tokio::test]
    async fn expired_record_is_gone() {
        let store = MemorySessionStore::new();
        let subject = SubjectId(Uuid::new_v4());

        store.upsert(subject, "hash", 0).await.unwrap();

        let found = store.lookup(subject).await.unwrap();
        assert!(found.is_none());
    }
}
