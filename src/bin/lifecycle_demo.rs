//! Drives the token lifecycle end to end against the in-memory backend:
//! issue, rotate, and replay a consumed refresh token.
//!
//! $ cargo run --bin lifecycle_demo

use keygate::application_impl::*;
use keygate::application_port::*;
use keygate::domain_model::SubjectId;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let codec: Arc<dyn TokenCodec> = Arc::new(JwtHs512Codec::new(JwtConfig {
        issuer: "keygate-demo".to_string(),
        access_ttl: Duration::from_secs(900),
        refresh_ttl: Duration::from_secs(3600),
        signing_key: b"demo-signing-secret".to_vec(),
    }));
    let hasher: Arc<dyn SecretHasher> = Arc::new(Argon2SecretHasher::new()?);
    let session_store = Arc::new(MemorySessionStore::new());

    let service = RealTokenService::new(codec, hasher, session_store);

    let subject = SubjectId(uuid::Uuid::new_v4());
    println!("subject: {}", subject);

    let first = service.issue(subject).await?;
    println!("issued: {}", serde_json::to_string_pretty(&first)?);

    let rotated = service.refresh(&first.refresh_token.0).await?;
    println!("rotated: {}", serde_json::to_string_pretty(&rotated)?);

    match service.refresh(&first.refresh_token.0).await {
        Err(e) => println!("replaying the consumed token fails: {}", e),
        Ok(_) => println!("unexpected: consumed token was accepted"),
    }

    Ok(())
}
