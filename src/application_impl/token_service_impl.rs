use crate::application_port::{
    AccessToken, CodecError, RefreshToken, SecretHasher, TokenCodec, TokenError, TokenPair,
    TokenService, TokenVerifyResult,
};
use crate::domain_model::SubjectId;
use crate::domain_port::SessionStore;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct Argon2SecretHasher {
    params: Params,
}

impl Argon2SecretHasher {
    // 64 MiB / 3 passes / 4 lanes, tens of milliseconds per hash
    const M_COST_KIB: u32 = 64 * 1024;
    const T_COST: u32 = 3;
    const P_COST: u32 = 4;

    pub fn new() -> Result<Self, TokenError> {
        Self::with_params(Self::M_COST_KIB, Self::T_COST, Self::P_COST)
    }

    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, TokenError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| TokenError::Internal(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

#[async_trait::async_trait]
impl SecretHasher for Argon2SecretHasher {
    async fn hash(&self, secret: &[u8]) -> Result<String, TokenError> {
        let argon2 = self.argon2();
        let secret = secret.to_vec();
        // CPU-bound; keep it off the async workers and hold no locks.
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(&secret, &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| TokenError::Internal(e.to_string()))
        })
        .await
        .map_err(|e| TokenError::Internal(e.to_string()))?
    }

    async fn verify(&self, hash: &str, candidate: &[u8]) -> Result<bool, TokenError> {
        let argon2 = self.argon2();
        let hash = hash.to_string();
        let candidate = candidate.to_vec();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| TokenError::Internal(format!("stored hash unreadable: {}", e)))?;
            match argon2.verify_password(&candidate, &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(TokenError::Internal(e.to_string())),
            }
        })
        .await
        .map_err(|e| TokenError::Internal(e.to_string()))?
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

// Distinct audiences keep the two token classes apart: a refresh
// verification never accepts an access token, and vice versa.
const ACCESS_AUDIENCE: &str = "keygate-access";
const REFRESH_AUDIENCE: &str = "keygate-refresh";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String, // random per mint, so consecutive mints never collide
}

pub struct JwtHs512Codec {
    cfg: JwtConfig,
}

impl JwtHs512Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs512Codec { cfg }
    }

    fn mint(
        &self,
        subject: SubjectId,
        audience: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), CodecError> {
        let iat_dt = Utc::now();
        let exp_dt = iat_dt + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: audience.to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| CodecError::Signing(e.to_string()))?;
        Ok((token, exp_dt))
    }

    fn check(&self, token: &str, audience: &str) -> Result<TokenVerifyResult, CodecError> {
        let mut v = Validation::new(Algorithm::HS512);
        v.validate_exp = true;
        v.set_audience(&[audience]);
        v.set_issuer(&[self.cfg.issuer.as_str()]);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &v,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => CodecError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                CodecError::InvalidSignature
            }
            _ => CodecError::Malformed,
        })?;
        let subject = data
            .claims
            .sub
            .parse::<SubjectId>()
            .map_err(|_| CodecError::MissingSubject)?;
        Ok(TokenVerifyResult { subject })
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs512Codec {
    async fn mint_access(
        &self,
        subject: SubjectId,
    ) -> Result<(AccessToken, DateTime<Utc>), CodecError> {
        let (token, exp_dt) = self.mint(subject, ACCESS_AUDIENCE, self.cfg.access_ttl)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn mint_refresh(
        &self,
        subject: SubjectId,
    ) -> Result<(RefreshToken, DateTime<Utc>), CodecError> {
        let (token, exp_dt) = self.mint(subject, REFRESH_AUDIENCE, self.cfg.refresh_ttl)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access(&self, token: &str) -> Result<TokenVerifyResult, CodecError> {
        self.check(token, ACCESS_AUDIENCE)
    }

    async fn verify_refresh(&self, token: &str) -> Result<TokenVerifyResult, CodecError> {
        self.check(token, REFRESH_AUDIENCE)
    }
}

pub struct RealTokenService {
    codec: Arc<dyn TokenCodec>,
    hasher: Arc<dyn SecretHasher>,
    session_store: Arc<dyn SessionStore>,
}

impl RealTokenService {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        hasher: Arc<dyn SecretHasher>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            codec,
            hasher,
            session_store,
        }
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let secs = (until - Utc::now()).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn issue(&self, subject: SubjectId) -> Result<TokenPair, TokenError> {
        let (access_token, access_expires_at) = self.codec.mint_access(subject).await?;
        let (refresh_token, refresh_expires_at) = self.codec.mint_refresh(subject).await?;

        let secret_hash = self.hasher.hash(refresh_token.0.as_bytes()).await?;
        let ttl_secs = Self::ttl_secs(refresh_expires_at);
        self.session_store
            .upsert(subject, &secret_hash, ttl_secs)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token: RefreshToken(BASE64.encode(refresh_token.0.as_bytes())),
            access_expires_at,
            refresh_expires_at,
        })
    }

    async fn refresh(&self, presented: &str) -> Result<TokenPair, TokenError> {
        let raw = BASE64
            .decode(presented.trim())
            .map_err(|_| TokenError::InputMalformed)?;
        let signed = String::from_utf8(raw).map_err(|_| TokenError::InputMalformed)?;

        let verified = self.codec.verify_refresh(&signed).await?;

        let stored_hash = self
            .session_store
            .lookup(verified.subject)
            .await?
            .ok_or(TokenError::CredentialInvalid)?;

        // Rotation enforcement: only the hash of the latest issued refresh
        // token is on file, so an already-rotated token fails here.
        if !self.hasher.verify(&stored_hash, signed.as_bytes()).await? {
            return Err(TokenError::CredentialInvalid);
        }

        self.issue(verified.subject).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::MemorySessionStore;

    const TEST_KEY: &[u8] = b"test-signing-secret";

    fn test_codec() -> JwtHs512Codec {
        JwtHs512Codec::new(JwtConfig {
            issuer: "keygate-test".to_string(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(3600),
            signing_key: TEST_KEY.to_vec(),
        })
    }

    fn test_hasher() -> Argon2SecretHasher {
        // lightest argon2 parameters; production cost is irrelevant here
        Argon2SecretHasher::with_params(8, 1, 1).unwrap()
    }

    fn test_service() -> (RealTokenService, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let service = RealTokenService::new(
            Arc::new(test_codec()),
            Arc::new(test_hasher()),
            store.clone(),
        );
        (service, store)
    }

    fn some_subject() -> SubjectId {
        SubjectId(Uuid::new_v4())
    }

    fn encode_raw(claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS512),
            claims,
            &EncodingKey::from_secret(TEST_KEY),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn issue_then_refresh_rotates_the_refresh_token() {
        let (service, _) = test_service();
        let subject = some_subject();

        let first = service.issue(subject).await.unwrap();
        let second = service.refresh(&first.refresh_token.0).await.unwrap();

        assert_ne!(first.refresh_token.0, second.refresh_token.0);
        assert_ne!(first.access_token.0, second.access_token.0);
    }

    #[tokio::test]
    async fn used_refresh_token_is_rejected_on_replay() {
        let (service, _) = test_service();
        let subject = some_subject();

        let first = service.issue(subject).await.unwrap();
        service.refresh(&first.refresh_token.0).await.unwrap();

        let replay = service.refresh(&first.refresh_token.0).await;
        assert!(matches!(replay, Err(TokenError::CredentialInvalid)));
    }

    #[tokio::test]
    async fn rotation_chain_scenario() {
        let (service, _) = test_service();
        let subject = some_subject();

        let first = service.issue(subject).await.unwrap();
        let second = service.refresh(&first.refresh_token.0).await.unwrap();
        assert_ne!(first.refresh_token.0, second.refresh_token.0);

        assert!(matches!(
            service.refresh(&first.refresh_token.0).await,
            Err(TokenError::CredentialInvalid)
        ));

        let third = service.refresh(&second.refresh_token.0).await.unwrap();
        assert_ne!(second.refresh_token.0, third.refresh_token.0);
    }

    #[tokio::test]
    async fn expired_refresh_token_fails_even_with_matching_stored_hash() {
        let (service, store) = test_service();
        let subject = some_subject();

        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now - Duration::from_secs(3600)).timestamp(),
            iat: (now - Duration::from_secs(7200)).timestamp(),
            iss: "keygate-test".to_string(),
            aud: REFRESH_AUDIENCE.to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        let signed = encode_raw(&claims);

        let hash = test_hasher().hash(signed.as_bytes()).await.unwrap();
        store.upsert(subject, &hash, 60).await.unwrap();

        let result = service.refresh(&BASE64.encode(signed.as_bytes())).await;
        assert!(matches!(result, Err(TokenError::CredentialInvalid)));
    }

    #[tokio::test]
    async fn access_token_is_not_accepted_for_refresh() {
        let (service, _) = test_service();
        let subject = some_subject();

        let pair = service.issue(subject).await.unwrap();
        assert!(pair.access_expires_at < pair.refresh_expires_at);

        let result = service
            .refresh(&BASE64.encode(pair.access_token.0.as_bytes()))
            .await;
        assert!(matches!(result, Err(TokenError::CredentialInvalid)));
    }

    #[tokio::test]
    async fn unknown_subject_and_tampered_token_are_indistinguishable() {
        let (service, _) = test_service();

        // well-formed token for a subject that never logged in
        let codec = test_codec();
        let (orphan, _) = codec.mint_refresh(some_subject()).await.unwrap();
        let unknown = service.refresh(&BASE64.encode(orphan.0.as_bytes())).await;

        // token signed with a different key
        let foreign_codec = JwtHs512Codec::new(JwtConfig {
            issuer: "keygate-test".to_string(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(3600),
            signing_key: b"some-other-secret".to_vec(),
        });
        let (forged, _) = foreign_codec.mint_refresh(some_subject()).await.unwrap();
        let tampered = service.refresh(&BASE64.encode(forged.0.as_bytes())).await;

        assert!(matches!(unknown, Err(TokenError::CredentialInvalid)));
        assert!(matches!(tampered, Err(TokenError::CredentialInvalid)));
    }

    #[tokio::test]
    async fn undecodable_input_is_reported_as_malformed() {
        let (service, _) = test_service();
        let result = service.refresh("%%% not base64 %%%").await;
        assert!(matches!(result, Err(TokenError::InputMalformed)));
    }

    #[tokio::test]
    async fn codec_roundtrip_and_class_separation() {
        let codec = test_codec();
        let subject = some_subject();

        let (access, _) = codec.mint_access(subject).await.unwrap();
        let (refresh, _) = codec.mint_refresh(subject).await.unwrap();

        assert_eq!(codec.verify_access(&access.0).await.unwrap().subject, subject);
        assert_eq!(codec.verify_refresh(&refresh.0).await.unwrap().subject, subject);

        assert!(matches!(
            codec.verify_refresh(&access.0).await,
            Err(CodecError::Malformed)
        ));
        assert!(matches!(
            codec.verify_access(&refresh.0).await,
            Err(CodecError::Malformed)
        ));
    }

    #[tokio::test]
    async fn codec_rejects_unparsable_subject() {
        let codec = test_codec();
        let now = Utc::now();
        let claims = Claims {
            sub: "not-an-identifier".to_string(),
            exp: (now + Duration::from_secs(3600)).timestamp(),
            iat: now.timestamp(),
            iss: "keygate-test".to_string(),
            aud: REFRESH_AUDIENCE.to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        let signed = encode_raw(&claims);

        assert!(matches!(
            codec.verify_refresh(&signed).await,
            Err(CodecError::MissingSubject)
        ));
    }

    #[tokio::test]
    async fn hashing_salts_every_call_and_both_outputs_verify() {
        let hasher = test_hasher();
        let secret = b"the-same-refresh-token";

        let first = hasher.hash(secret).await.unwrap();
        let second = hasher.hash(secret).await.unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify(&first, secret).await.unwrap());
        assert!(hasher.verify(&second, secret).await.unwrap());
        assert!(!hasher.verify(&first, b"a different token").await.unwrap());
    }

    #[tokio::test]
    async fn corrupted_stored_hash_is_an_infrastructure_error() {
        let hasher = test_hasher();
        let result = hasher.verify("not-a-phc-string", b"anything").await;
        assert!(matches!(result, Err(TokenError::Internal(_))));
    }

    #[tokio::test]
    async fn store_holds_only_the_latest_hash() {
        let (service, store) = test_service();
        let subject = some_subject();

        let first = service.issue(subject).await.unwrap();
        let after_first = store.lookup(subject).await.unwrap().unwrap();

        let _second = service.refresh(&first.refresh_token.0).await.unwrap();
        let after_second = store.lookup(subject).await.unwrap().unwrap();

        assert_ne!(after_first, after_second);
    }
}
