use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

/// Signing secret for both token classes. Loaded once at startup,
/// immutable for the process lifetime; no rotation support.
const SIGNING_SECRET_VAR: &str = "KEYGATE_SIGNING_SECRET";

pub struct Server {
    pub token_service: Arc<dyn TokenService>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let signing_key = std::env::var(SIGNING_SECRET_VAR)
            .map_err(|_| anyhow::anyhow!("{} must be set", SIGNING_SECRET_VAR))?
            .into_bytes();
        if signing_key.is_empty() {
            return Err(anyhow::anyhow!("{} must not be empty", SIGNING_SECRET_VAR));
        }

        let session_store: Arc<dyn SessionStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemorySessionStore::new()),
            "redis" => {
                let dsn = settings.store.dsn.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("store.dsn must be set for the redis backend")
                })?;
                let client = redis::Client::open(dsn)?;
                let manager = client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(manager, "session"))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let codec: Arc<dyn TokenCodec> = Arc::new(JwtHs512Codec::new(JwtConfig {
            issuer: settings.token.issuer.clone(),
            access_ttl: Duration::from_secs(settings.token.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.token.refresh_ttl_secs),
            signing_key,
        }));

        let hasher: Arc<dyn SecretHasher> = Arc::new(Argon2SecretHasher::new()?);

        let token_service: Arc<dyn TokenService> =
            Arc::new(RealTokenService::new(codec, hasher, session_store));

        info!("server started");

        Ok(Self { token_service })
    }
}
