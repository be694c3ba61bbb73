/// Factory: build `AuthService` from application `Config`.
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::services::auth::AuthService;
use crate::services::auth::jwks::{KeySource, RemoteJwks, StaticKey};

pub fn build_auth_service(config: &Config) -> Result<Arc<AuthService>, ConfigError> {
    let idp = &config.idp;
    let issuer = idp
        .issuer_uri
        .clone()
        .ok_or(ConfigError::Missing("AUTH0_ISSUER_URI"))?;

    let keys: Arc<dyn KeySource> = match idp.jwt_public_key_pem.as_deref() {
        Some(pem) => {
            tracing::info!("verifying access tokens with the configured static public key");
            Arc::new(
                StaticKey::from_rsa_pem(pem)
                    .map_err(|_| ConfigError::Invalid("AUTH0_JWT_PUBLIC_KEY_PEM"))?,
            )
        }
        None => {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(|_| ConfigError::Invalid("AUTH0_JWKS_URI"))?;
            Arc::new(RemoteJwks::new(
                http,
                issuer.clone(),
                idp.jwks_uri.clone(),
                Duration::from_secs(config.jwks_cache_ttl_seconds),
            ))
        }
    };

    let auth = AuthService::new(
        issuer,
        idp.audience.clone(),
        idp.jwt_algorithms.clone(),
        config.access_token_leeway_seconds,
        idp.claim_names(),
        keys,
    );

    Ok(Arc::new(auth))
}
