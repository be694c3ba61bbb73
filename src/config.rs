/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, CORS 許可, IdP (Auth0) 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - token endpoint URL の導出 (明示指定 > <issuer>/oauth/token)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::services::auth::authorities::ClaimNames;

pub const DEFAULT_PERMISSIONS_CLAIM: &str = "permissions";

/// ローカル開発用フロントエンド (Vite) の origin
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:5174"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// OAuth2 client credentials registered at the identity provider.
#[derive(Clone, Default)]
pub struct ClientConfig {
    pub id: Option<String>,
    pub secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the client secret
        f.debug_struct("ClientConfig")
            .field("id", &self.id)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Identity provider (Auth0 tenant) settings.
#[derive(Debug, Clone)]
pub struct IdpConfig {
    pub issuer_uri: Option<String>,
    pub audience: Option<String>,
    pub roles_claim: Option<String>,
    pub permissions_claim: String,
    pub token_endpoint: Option<String>,
    pub jwks_uri: Option<String>,
    pub jwt_algorithms: Vec<Algorithm>,
    pub jwt_public_key_pem: Option<String>,
    pub client: ClientConfig,
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            issuer_uri: None,
            audience: None,
            roles_claim: None,
            permissions_claim: DEFAULT_PERMISSIONS_CLAIM.to_string(),
            token_endpoint: None,
            jwks_uri: None,
            jwt_algorithms: vec![Algorithm::RS256],
            jwt_public_key_pem: None,
            client: ClientConfig::default(),
        }
    }
}

impl IdpConfig {
    /// Token endpoint used for the authorization-code exchange.
    ///
    /// An explicit `token_endpoint` always wins. Otherwise the issuer is required and
    /// normalized to exactly one trailing slash before `oauth/token` is appended.
    pub fn token_endpoint_url(&self) -> Result<Url, ConfigError> {
        if let Some(endpoint) = self.token_endpoint.as_deref() {
            return Url::parse(endpoint).map_err(|_| ConfigError::Invalid("AUTH0_TOKEN_ENDPOINT"));
        }

        let issuer = self
            .issuer_uri
            .as_deref()
            .ok_or(ConfigError::Missing("AUTH0_ISSUER_URI"))?;

        let base = format!("{}/", issuer.trim_end_matches('/'));
        Url::parse(&format!("{base}oauth/token"))
            .map_err(|_| ConfigError::Invalid("AUTH0_ISSUER_URI"))
    }

    pub fn claim_names(&self) -> ClaimNames {
        ClaimNames {
            roles_claim: self.roles_claim.clone(),
            permissions_claim: self.permissions_claim.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub request_timeout_seconds: u64,
    pub request_body_limit_bytes: usize,

    pub idp: IdpConfig,
    pub access_token_leeway_seconds: u64,
    pub jwks_cache_ttl_seconds: u64,
    pub token_exchange_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8086);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = match env_opt("CORS_ALLOWED_ORIGINS") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let request_timeout_seconds = non_zero(
            "REQUEST_TIMEOUT_SECONDS",
            env_parse("REQUEST_TIMEOUT_SECONDS", 30),
        )?;
        let token_exchange_timeout_seconds = non_zero(
            "TOKEN_EXCHANGE_TIMEOUT_SECONDS",
            env_parse("TOKEN_EXCHANGE_TIMEOUT_SECONDS", 10),
        )?;
        let request_body_limit_bytes = env_parse("REQUEST_BODY_LIMIT_BYTES", 1024 * 1024);

        let jwt_algorithms = match env_opt("AUTH0_JWT_ALGORITHMS") {
            Some(raw) => split_list(&raw)
                .iter()
                .map(|s| Algorithm::from_str(s))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ConfigError::Invalid("AUTH0_JWT_ALGORITHMS"))?,
            None => vec![Algorithm::RS256],
        };

        let idp = IdpConfig {
            issuer_uri: env_opt("AUTH0_ISSUER_URI"),
            audience: env_opt("AUTH0_AUDIENCE"),
            roles_claim: env_opt("AUTH0_ROLES_CLAIM"),
            permissions_claim: env_opt("AUTH0_PERMISSIONS_CLAIM")
                .unwrap_or_else(|| DEFAULT_PERMISSIONS_CLAIM.to_string()),
            token_endpoint: env_opt("AUTH0_TOKEN_ENDPOINT"),
            jwks_uri: env_opt("AUTH0_JWKS_URI"),
            jwt_algorithms,
            jwt_public_key_pem: env_opt("AUTH0_JWT_PUBLIC_KEY_PEM").map(|s| s.replace("\\n", "\n")),
            client: ClientConfig {
                id: env_opt("AUTH0_CLIENT_ID"),
                secret: env_opt("AUTH0_CLIENT_SECRET"),
                redirect_uri: env_opt("AUTH0_CLIENT_REDIRECT_URI"),
            },
        };

        // Fail fast: the gate cannot verify tokens without an issuer, and the exchange
        // endpoint must be derivable.
        if idp.issuer_uri.is_none() {
            return Err(ConfigError::Missing("AUTH0_ISSUER_URI"));
        }
        idp.token_endpoint_url()?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            request_timeout_seconds,
            request_body_limit_bytes,
            idp,
            access_token_leeway_seconds: env_parse("ACCESS_TOKEN_LEEWAY_SECONDS", 60),
            jwks_cache_ttl_seconds: env_parse("JWKS_CACHE_TTL_SECONDS", 300),
            token_exchange_timeout_seconds,
        })
    }
}

// Blank values count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

// A zero timeout would fail every request it guards.
fn non_zero(key: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idp(issuer: Option<&str>, endpoint: Option<&str>) -> IdpConfig {
        IdpConfig {
            issuer_uri: issuer.map(str::to_string),
            token_endpoint: endpoint.map(str::to_string),
            ..IdpConfig::default()
        }
    }

    #[test]
    fn token_endpoint_is_derived_from_issuer_with_trailing_slash() {
        let url = idp(Some("https://x.example/"), None)
            .token_endpoint_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://x.example/oauth/token");
    }

    #[test]
    fn token_endpoint_is_derived_from_issuer_without_trailing_slash() {
        let url = idp(Some("https://x.example"), None)
            .token_endpoint_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://x.example/oauth/token");
    }

    #[test]
    fn token_endpoint_collapses_repeated_trailing_slashes() {
        let url = idp(Some("https://tenant.example/base//"), None)
            .token_endpoint_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://tenant.example/base/oauth/token");
    }

    #[test]
    fn explicit_token_endpoint_wins() {
        let url = idp(
            Some("https://x.example/"),
            Some("https://login.other.example/custom/token"),
        )
        .token_endpoint_url()
        .unwrap();
        assert_eq!(url.as_str(), "https://login.other.example/custom/token");

        let url = idp(None, Some("https://login.other.example/custom/token"))
            .token_endpoint_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://login.other.example/custom/token");
    }

    #[test]
    fn missing_issuer_without_override_is_a_configuration_error() {
        let err = idp(None, None).token_endpoint_url().unwrap_err();
        assert_eq!(err, ConfigError::Missing("AUTH0_ISSUER_URI"));
    }

    #[test]
    fn client_secret_is_not_printed() {
        let client = ClientConfig {
            id: Some("client".into()),
            secret: Some("super-secret".into()),
            redirect_uri: None,
        };
        let printed = format!("{:?}", client);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        assert_eq!(
            non_zero("TOKEN_EXCHANGE_TIMEOUT_SECONDS", 0),
            Err(ConfigError::Invalid("TOKEN_EXCHANGE_TIMEOUT_SECONDS"))
        );
        assert_eq!(
            non_zero("REQUEST_TIMEOUT_SECONDS", 0),
            Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"))
        );
        assert_eq!(non_zero("REQUEST_TIMEOUT_SECONDS", 30), Ok(30));
    }

    #[test]
    fn split_list_drops_blank_entries() {
        assert_eq!(
            split_list(" http://a , ,http://b,"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }
}
