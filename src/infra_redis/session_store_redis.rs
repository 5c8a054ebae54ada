use crate::application_port::TokenError;
use crate::domain_model::SubjectId;
use crate::domain_port::SessionStore;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, subject: SubjectId) -> String {
        format!("{}:{}", self.prefix, subject)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn upsert(
        &self,
        subject: SubjectId,
        secret_hash: &str,
        ttl_secs: u64,
    ) -> Result<(), TokenError> {
        let key = self.key(subject);
        let mut conn = self.conn.clone();
        // SET with EX replaces value and TTL in one step
        let _: () = conn
            .set_ex(&key, secret_hash, ttl_secs)
            .await
            .map_err(|e| TokenError::Store(e.to_string()))?;
        Ok(())
    }

    async fn lookup(&self, subject: SubjectId) -> Result<Option<String>, TokenError> {
        let key = self.key(subject);
        let mut conn = self.conn.clone();
        let val: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| TokenError::Store(e.to_string()))?;
        Ok(val)
    }
}
