use std::sync::Arc;

use jsonwebtoken::{Algorithm, Validation};

use crate::error::AuthFailure;
use crate::services::auth::authorities::{AuthoritySet, ClaimNames, derive_authorities};
use crate::services::auth::claims::{Claims, VerifiedToken};
use crate::services::auth::jwks::{KeySource, KeySourceError};

// Errors returned by access-token verification.
#[derive(Debug, thiserror::Error)]
pub enum AccessJwtError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("signing key unavailable: {0}")]
    Key(#[from] KeySourceError),
    #[error("unsupported token algorithm: {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("the required audience is missing from the token")]
    AudienceMissing,
}

impl AccessJwtError {
    pub fn failure(&self) -> AuthFailure {
        match self {
            Self::AudienceMissing => AuthFailure::AudienceMissing,
            _ => AuthFailure::InvalidToken,
        }
    }
}

/// Access-token verifier for tokens issued by the identity provider.
///
/// - signature: key from the configured `KeySource` (JWKS or static PEM)
/// - `iss` exact match, `exp`/`nbf` with leeway
/// - `aud` membership when an audience is configured
///
/// Key material is not printable via Debug.
#[derive(Clone)]
pub struct AuthService {
    issuer: String,
    audience: Option<String>,
    algorithms: Vec<Algorithm>,
    leeway_seconds: u64,
    claim_names: ClaimNames,
    keys: Arc<dyn KeySource>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("algorithms", &self.algorithms)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("claim_names", &self.claim_names)
            .finish()
    }
}

impl AuthService {
    pub fn new(
        issuer: impl Into<String>,
        audience: Option<String>,
        algorithms: Vec<Algorithm>,
        leeway_seconds: u64,
        claim_names: ClaimNames,
        keys: Arc<dyn KeySource>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience,
            algorithms,
            leeway_seconds,
            claim_names,
            keys,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    /// Verify a raw bearer token and return its typed claims.
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, AccessJwtError> {
        let header = jsonwebtoken::decode_header(token)?;

        if !self.algorithms.contains(&header.alg) {
            return Err(AccessJwtError::UnsupportedAlgorithm(header.alg));
        }

        let key = self.keys.decoding_key(&header).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_nbf = true;
        validation.leeway = self.leeway_seconds;
        // Audience is checked below so the failure keeps its own reason.
        validation.validate_aud = false;

        let data = jsonwebtoken::decode::<Claims>(token, &key, &validation)?;
        let verified = VerifiedToken::from_claims(data.claims);

        if let Some(audience) = self.audience.as_deref()
            && !verified.has_audience(audience)
        {
            return Err(AccessJwtError::AudienceMissing);
        }

        Ok(verified)
    }

    pub fn authorities(&self, token: &VerifiedToken) -> AuthoritySet {
        derive_authorities(&token.claims, &self.claim_names)
    }
}
