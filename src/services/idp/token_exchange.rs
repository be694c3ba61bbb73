//! OAuth2 authorization-code exchange against the identity provider's token endpoint.
//!
//! One form-encoded `POST` per exchange, no retries. Provider failures are folded
//! into two upstream kinds so callers never see provider-specific error formats:
//! - `UpstreamRejected`: the provider answered with an error status
//! - `UpstreamUnreachable`: transport failure (connect, timeout, unreadable body)

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ClientConfig, ConfigError, IdpConfig};

const SUMMARY_MAX_CHARS: usize = 256;
const ELLIPSIS: &str = "...";

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("http client build failed: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("identity provider rejected the token exchange ({status}): {summary}")]
    UpstreamRejected { status: StatusCode, summary: String },
    #[error("could not reach the identity provider token endpoint")]
    UpstreamUnreachable(#[source] reqwest::Error),
}

/// Token endpoint response. Every field is optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExchangeResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub issued_token_type: Option<String>,
}

#[derive(Clone)]
pub struct TokenExchangeClient {
    http: reqwest::Client,
    endpoint: Url,
    client: ClientConfig,
    audience: Option<String>,
}

impl std::fmt::Debug for TokenExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchangeClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("client", &self.client)
            .field("audience", &self.audience)
            .finish()
    }
}

impl TokenExchangeClient {
    pub fn new(idp: &IdpConfig, timeout: Duration) -> Result<Self, ExchangeError> {
        let endpoint = idp.token_endpoint_url()?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(ExchangeError::HttpClient)?;

        Ok(Self {
            http,
            endpoint,
            client: idp.client.clone(),
            audience: idp.audience.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Form body for the `authorization_code` grant.
    ///
    /// Validates inputs first; nothing here touches the network.
    pub fn form(
        &self,
        code: &str,
        code_verifier: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> Result<Vec<(&'static str, String)>, ExchangeError> {
        if code.trim().is_empty() {
            return Err(ExchangeError::InvalidArgument(
                "authorization code must not be blank",
            ));
        }
        let client_id = self
            .client
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ExchangeError::InvalidArgument(
                "AUTH0_CLIENT_ID must be configured",
            ))?;

        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("client_id", client_id.to_string()),
        ];

        if let Some(secret) = non_blank(self.client.secret.as_deref()) {
            form.push(("client_secret", secret.to_string()));
        }
        // Caller override first, configured value otherwise.
        if let Some(uri) =
            non_blank(redirect_uri).or_else(|| non_blank(self.client.redirect_uri.as_deref()))
        {
            form.push(("redirect_uri", uri.to_string()));
        }
        if let Some(verifier) = non_blank(code_verifier) {
            form.push(("code_verifier", verifier.to_string()));
        }
        if let Some(audience) = non_blank(self.audience.as_deref()) {
            form.push(("audience", audience.to_string()));
        }

        Ok(form)
    }

    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> Result<TokenExchangeResponse, ExchangeError> {
        let form = self.form(code, code_verifier, redirect_uri)?;

        tracing::info!(endpoint = %self.endpoint, "exchanging authorization code for tokens");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(endpoint = %self.endpoint, error = %e, "token endpoint unreachable");
                ExchangeError::UpstreamUnreachable(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let summary = summarize(&body);
            tracing::error!(
                endpoint = %self.endpoint,
                status = %status,
                details = %summary,
                "token exchange rejected"
            );
            return Err(ExchangeError::UpstreamRejected { status, summary });
        }

        resp.json::<TokenExchangeResponse>().await.map_err(|e| {
            tracing::error!(endpoint = %self.endpoint, error = %e, "unreadable token response");
            ExchangeError::UpstreamUnreachable(e)
        })
    }
}

/// Short, bounded description of a provider error body.
pub fn summarize(body: &str) -> String {
    if body.trim().is_empty() {
        return "no details".to_string();
    }
    if body.chars().count() <= SUMMARY_MAX_CHARS {
        return body.to_string();
    }
    let head: String = body
        .chars()
        .take(SUMMARY_MAX_CHARS - ELLIPSIS.len())
        .collect();
    format!("{head}{ELLIPSIS}")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn idp(endpoint: &str, full: bool) -> IdpConfig {
        IdpConfig {
            issuer_uri: Some("https://tenant.example/".into()),
            token_endpoint: Some(endpoint.to_string()),
            audience: full.then(|| "https://api.example".to_string()),
            client: ClientConfig {
                id: Some("client-123".into()),
                secret: full.then(|| "s3cr3t".to_string()),
                redirect_uri: full.then(|| "http://localhost:5173/callback".to_string()),
            },
            ..IdpConfig::default()
        }
    }

    fn client(idp: &IdpConfig) -> TokenExchangeClient {
        TokenExchangeClient::new(idp, Duration::from_secs(5)).unwrap()
    }

    fn keys(form: &[(&'static str, String)]) -> Vec<&'static str> {
        form.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn full_configuration_produces_every_field() {
        let c = client(&idp("https://tenant.example/oauth/token", true));
        let form = c.form("the-code", Some("verifier"), None).unwrap();

        assert_eq!(
            form,
            vec![
                ("grant_type", "authorization_code".to_string()),
                ("code", "the-code".to_string()),
                ("client_id", "client-123".to_string()),
                ("client_secret", "s3cr3t".to_string()),
                ("redirect_uri", "http://localhost:5173/callback".to_string()),
                ("code_verifier", "verifier".to_string()),
                ("audience", "https://api.example".to_string()),
            ]
        );
    }

    #[test]
    fn minimal_configuration_produces_required_fields_only() {
        let c = client(&idp("https://tenant.example/oauth/token", false));
        let form = c.form("the-code", None, None).unwrap();
        assert_eq!(keys(&form), vec!["grant_type", "code", "client_id"]);
    }

    #[test]
    fn redirect_uri_override_wins() {
        let c = client(&idp("https://tenant.example/oauth/token", true));
        let form = c
            .form("the-code", None, Some("https://app.example/cb"))
            .unwrap();
        assert!(form.contains(&("redirect_uri", "https://app.example/cb".to_string())));
        assert!(!keys(&form).contains(&"code_verifier"));
    }

    #[test]
    fn summarize_bounds_long_bodies() {
        let long = "e".repeat(300);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 256);
        assert!(summary.ends_with("..."));

        assert_eq!(summarize("short"), "short");
        assert_eq!(summarize("   "), "no details");
        assert_eq!(summarize(&"x".repeat(256)), "x".repeat(256));
    }

    #[test]
    fn endpoint_is_derived_from_issuer() {
        let idp = IdpConfig {
            issuer_uri: Some("https://tenant.example".into()),
            ..IdpConfig::default()
        };
        let c = client(&idp);
        assert_eq!(c.endpoint().as_str(), "https://tenant.example/oauth/token");
    }

    #[tokio::test]
    async fn blank_code_fails_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let c = client(&idp(&format!("{}/oauth/token", server.uri()), true));
        let err = c
            .exchange_authorization_code("  ", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn missing_client_id_fails_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = idp(&format!("{}/oauth/token", server.uri()), true);
        config.client.id = None;
        let err = client(&config)
            .exchange_authorization_code("the-code", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn successful_exchange_parses_token_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string(
                "grant_type=authorization_code&code=abc&client_id=client-123&code_verifier=v1",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at",
                "id_token": "it",
                "scope": "openid read",
                "expires_in": 86400,
                "token_type": "Bearer",
                "something_new": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&idp(&format!("{}/oauth/token", server.uri()), false));
        let tokens = c
            .exchange_authorization_code("abc", Some("v1"), None)
            .await
            .unwrap();

        assert_eq!(tokens.access_token.as_deref(), Some("at"));
        assert_eq!(tokens.id_token.as_deref(), Some("it"));
        assert_eq!(tokens.expires_in, Some(86400));
        assert_eq!(tokens.token_type.as_deref(), Some("Bearer"));
        assert!(tokens.refresh_token.is_none());
        assert!(tokens.issued_token_type.is_none());
    }

    #[tokio::test]
    async fn error_status_maps_to_upstream_rejected_with_summary() {
        let server = MockServer::start().await;
        let body = format!(r#"{{"error":"invalid_grant","error_description":"{}"}}"#, "d".repeat(400));
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(400).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&idp(&format!("{}/oauth/token", server.uri()), true));
        let err = c
            .exchange_authorization_code("expired-code", None, None)
            .await
            .unwrap_err();

        match err {
            ExchangeError::UpstreamRejected { status, summary } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(summary.chars().count(), 256);
                assert!(summary.ends_with("..."));
                assert!(summary.starts_with(r#"{"error":"invalid_grant""#));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_maps_to_upstream_unreachable() {
        // Nothing listens on port 9 locally.
        let c = client(&idp("http://127.0.0.1:9/oauth/token", true));
        let err = c
            .exchange_authorization_code("the-code", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::UpstreamUnreachable(_)));
    }
}
