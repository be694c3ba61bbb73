//! Signing-key lookup for access-token verification.
//!
//! `KeySource` is the seam between the verifier and wherever keys come from:
//! - `RemoteJwks`: the identity provider's published JWKS (discovered from the issuer),
//!   cached with a TTL and refreshed when an unknown `kid` shows up, at most once per
//!   `MIN_FORCED_REFRESH_INTERVAL`.
//! - `StaticKey`: a single pre-configured key (PEM from config, or tests).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{DecodingKey, Header};
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum KeySourceError {
    #[error("oidc discovery failed: {0}")]
    Discovery(String),
    #[error("jwks fetch failed: {0}")]
    Fetch(String),
    #[error("no jwks keys available")]
    NoKeys,
    #[error("token kid is required when multiple jwks keys are present")]
    MissingKid,
    #[error("jwks key not found for kid: {0}")]
    KeyNotFound(String),
    #[error("invalid jwk: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
}

#[async_trait]
pub trait KeySource: Send + Sync {
    // Resolve the key that should verify a token carrying `header`.
    async fn decoding_key(&self, header: &Header) -> Result<DecodingKey, KeySourceError>;
}

/// One fixed key, regardless of `kid`.
#[derive(Clone)]
pub struct StaticKey(DecodingKey);

impl StaticKey {
    pub fn new(key: DecodingKey) -> Self {
        Self(key)
    }

    /// RSA public key in PEM form (`-----BEGIN PUBLIC KEY-----`).
    pub fn from_rsa_pem(pem: &str) -> Result<Self, KeySourceError> {
        DecodingKey::from_rsa_pem(pem.as_bytes())
            .map(Self)
            .map_err(KeySourceError::InvalidKey)
    }
}

#[async_trait]
impl KeySource for StaticKey {
    async fn decoding_key(&self, _header: &Header) -> Result<DecodingKey, KeySourceError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug)]
struct CachedJwks {
    fetched_at: Instant,
    expires_at: Instant,
    jwks: Arc<JwkSet>,
}

#[derive(Debug, Deserialize)]
struct OidcDiscoveryDoc {
    jwks_uri: String,
}

/// Minimum spacing between refreshes triggered by an unknown `kid`.
pub const MIN_FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

pub struct RemoteJwks {
    http: reqwest::Client,
    issuer: String,
    configured_jwks_uri: Option<String>,
    discovered_jwks_uri: OnceCell<String>,
    ttl: Duration,
    cache: RwLock<Option<CachedJwks>>,
    // Serializes fetches; holds the time of the last unknown-kid refresh.
    // Never held together with a `cache` lock across I/O.
    refresh: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for RemoteJwks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteJwks")
            .field("issuer", &self.issuer)
            .field("configured_jwks_uri", &self.configured_jwks_uri)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl RemoteJwks {
    pub fn new(
        http: reqwest::Client,
        issuer: impl Into<String>,
        jwks_uri: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            http,
            issuer: issuer.into(),
            configured_jwks_uri: jwks_uri,
            discovered_jwks_uri: OnceCell::new(),
            ttl,
            cache: RwLock::new(None),
            refresh: Mutex::new(None),
        }
    }

    async fn jwks_uri(&self) -> Result<&str, KeySourceError> {
        if let Some(uri) = self.configured_jwks_uri.as_deref() {
            return Ok(uri);
        }

        let uri = self
            .discovered_jwks_uri
            .get_or_try_init(|| discover_jwks_uri(&self.http, &self.issuer))
            .await?;
        Ok(uri.as_str())
    }

    async fn fresh_cached(&self) -> Option<Arc<JwkSet>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.jwks.clone())
    }

    async fn current_cached(&self) -> Option<Arc<JwkSet>> {
        self.cache.read().await.as_ref().map(|entry| entry.jwks.clone())
    }

    /// Cached keys while fresh; otherwise one fetch shared by all waiting callers.
    async fn jwks(&self) -> Result<Arc<JwkSet>, KeySourceError> {
        if let Some(jwks) = self.fresh_cached().await {
            return Ok(jwks);
        }

        let _refresh = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(jwks) = self.fresh_cached().await {
            return Ok(jwks);
        }
        self.fetch_and_store().await
    }

    /// Refresh after a `kid` miss against `seen`. `None` means the refresh was
    /// skipped because one ran within `MIN_FORCED_REFRESH_INTERVAL`.
    async fn refresh_for_unknown_kid(
        &self,
        seen: &Arc<JwkSet>,
    ) -> Result<Option<Arc<JwkSet>>, KeySourceError> {
        let mut last_forced = self.refresh.lock().await;

        if let Some(current) = self.current_cached().await
            && !Arc::ptr_eq(&current, seen)
        {
            return Ok(Some(current));
        }

        if let Some(at) = *last_forced
            && at.elapsed() < MIN_FORCED_REFRESH_INTERVAL
        {
            return Ok(None);
        }

        *last_forced = Some(Instant::now());
        self.fetch_and_store().await.map(Some)
    }

    // Callers hold `refresh`. The cache is only locked to read or swap.
    async fn fetch_and_store(&self) -> Result<Arc<JwkSet>, KeySourceError> {
        let uri = self.jwks_uri().await?;

        match fetch_jwks(&self.http, uri).await {
            Ok(jwks) => {
                let jwks = Arc::new(jwks);
                let now = Instant::now();
                tracing::debug!(jwks_uri = %uri, keys = jwks.keys.len(), "jwks refreshed");
                *self.cache.write().await = Some(CachedJwks {
                    fetched_at: now,
                    expires_at: now + self.ttl,
                    jwks: jwks.clone(),
                });
                Ok(jwks)
            }
            Err(err) => {
                // Keep serving the previous keys when the refresh fails.
                let cache = self.cache.read().await;
                if let Some(entry) = cache.as_ref() {
                    tracing::warn!(
                        jwks_uri = %uri,
                        error = %err,
                        fetched_at_ms_ago = entry.fetched_at.elapsed().as_millis(),
                        "jwks refresh failed; using cached keys"
                    );
                    return Ok(entry.jwks.clone());
                }
                Err(KeySourceError::Fetch(err))
            }
        }
    }
}

#[async_trait]
impl KeySource for RemoteJwks {
    async fn decoding_key(&self, header: &Header) -> Result<DecodingKey, KeySourceError> {
        let kid = header.kid.as_deref();
        let jwks = self.jwks().await?;
        match select_jwk(&jwks, kid) {
            Ok(jwk) => return DecodingKey::from_jwk(jwk).map_err(KeySourceError::InvalidKey),
            Err(KeySourceError::KeyNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        let Some(jwks) = self.refresh_for_unknown_kid(&jwks).await? else {
            tracing::debug!(kid = ?kid, "unknown kid; refresh throttled");
            return Err(KeySourceError::KeyNotFound(kid.unwrap_or_default().to_string()));
        };
        tracing::info!(kid = ?kid, "unknown kid; jwks refreshed");
        let jwk = select_jwk(&jwks, kid)?;
        DecodingKey::from_jwk(jwk).map_err(KeySourceError::InvalidKey)
    }
}

fn select_jwk<'a>(jwks: &'a JwkSet, kid: Option<&str>) -> Result<&'a Jwk, KeySourceError> {
    if jwks.keys.is_empty() {
        return Err(KeySourceError::NoKeys);
    }

    if let Some(kid) = kid {
        return jwks
            .keys
            .iter()
            .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))
            .ok_or_else(|| KeySourceError::KeyNotFound(kid.to_string()));
    }

    match jwks.keys.as_slice() {
        [only] => Ok(only),
        _ => Err(KeySourceError::MissingKid),
    }
}

async fn discover_jwks_uri(
    http: &reqwest::Client,
    issuer: &str,
) -> Result<String, KeySourceError> {
    let url = format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    );

    let resp = http
        .get(&url)
        .send()
        .await
        .map_err(|e| KeySourceError::Discovery(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(KeySourceError::Discovery(format!(
            "GET {} returned {}",
            url,
            resp.status()
        )));
    }

    let doc = resp
        .json::<OidcDiscoveryDoc>()
        .await
        .map_err(|e| KeySourceError::Discovery(e.to_string()))?;

    if doc.jwks_uri.trim().is_empty() {
        return Err(KeySourceError::Discovery("discovery jwks_uri is empty".into()));
    }

    tracing::info!(issuer = %issuer, jwks_uri = %doc.jwks_uri, "discovered jwks uri");
    Ok(doc.jwks_uri)
}

async fn fetch_jwks(http: &reqwest::Client, jwks_uri: &str) -> Result<JwkSet, String> {
    let resp = http.get(jwks_uri).send().await.map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
        return Err(format!("GET {} returned {}", jwks_uri, resp.status()));
    }

    resp.json::<JwkSet>().await.map_err(|e| e.to_string())
}
