//! Typed view over a verified token's payload.
//!
//! Claims are kept as a map from name to a small tagged union so authority
//! derivation can stay a pure function over `Claims` + claim-name config.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    String(String),
    List(Vec<String>),
    Number(serde_json::Number),
    Bool(bool),
    Null,
    // Objects and mixed arrays (custom namespaced claims etc.)
    Other(serde_json::Value),
}

impl ClaimValue {
    /// Values usable as authority names.
    ///
    /// - string: space-delimited (OAuth2 `scope` convention)
    /// - list: each non-blank entry
    /// - anything else: nothing
    pub fn authority_values(&self) -> Vec<&str> {
        match self {
            ClaimValue::String(s) => s.split_whitespace().collect(),
            ClaimValue::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ClaimValue::Null)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, ClaimValue>);

impl Claims {
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.0.get(name)
    }

    fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        self.get(name)
            .and_then(ClaimValue::as_i64)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

/// Token whose signature, issuer and validity window were already checked.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub subject: Option<String>,
    pub audience: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub claims: Claims,
}

impl VerifiedToken {
    pub fn from_claims(claims: Claims) -> Self {
        let subject = claims.get("sub").and_then(ClaimValue::as_str).map(str::to_string);

        // `aud` may be a single string or an array of strings
        let audience = match claims.get("aud") {
            Some(ClaimValue::String(s)) => vec![s.clone()],
            Some(ClaimValue::List(items)) => items.clone(),
            _ => Vec::new(),
        };

        Self {
            subject,
            audience,
            issued_at: claims.timestamp("iat"),
            expires_at: claims.timestamp("exp"),
            claims,
        }
    }

    pub fn has_audience(&self, audience: &str) -> bool {
        self.audience.iter().any(|a| a == audience)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn claim_values_are_typed() {
        let c = claims(json!({
            "sub": "auth0|123",
            "scope": "read write",
            "permissions": ["read:items"],
            "exp": 1_700_000_000,
            "email_verified": true,
            "nickname": null,
            "https://example.com/meta": {"plan": "free"},
            "mixed": ["a", 1]
        }));

        assert_eq!(c.get("sub"), Some(&ClaimValue::String("auth0|123".into())));
        assert_eq!(
            c.get("permissions"),
            Some(&ClaimValue::List(vec!["read:items".into()]))
        );
        assert_eq!(c.get("exp").and_then(ClaimValue::as_i64), Some(1_700_000_000));
        assert_eq!(c.get("email_verified"), Some(&ClaimValue::Bool(true)));
        assert!(c.get("nickname").unwrap().is_null());
        assert!(matches!(c.get("https://example.com/meta"), Some(ClaimValue::Other(_))));
        assert!(matches!(c.get("mixed"), Some(ClaimValue::Other(_))));
    }

    #[test]
    fn authority_values_split_strings_and_lists() {
        assert_eq!(
            ClaimValue::String(" read  write ".into()).authority_values(),
            vec!["read", "write"]
        );
        assert_eq!(
            ClaimValue::List(vec!["admin".into(), " ".into()]).authority_values(),
            vec!["admin"]
        );
        assert!(ClaimValue::Bool(true).authority_values().is_empty());
        assert!(ClaimValue::Null.authority_values().is_empty());
    }

    #[test]
    fn verified_token_reads_standard_claims() {
        let token = VerifiedToken::from_claims(claims(json!({
            "sub": "user-1",
            "aud": ["https://api.example", "https://tenant.example/userinfo"],
            "iat": 1_700_000_000,
            "exp": 1_700_003_600
        })));

        assert_eq!(token.subject.as_deref(), Some("user-1"));
        assert!(token.has_audience("https://api.example"));
        assert!(!token.has_audience("https://api.example/"));
        assert_eq!(token.issued_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(token.expires_at.unwrap().timestamp(), 1_700_003_600);
    }

    #[test]
    fn single_string_audience_becomes_one_element_list() {
        let token = VerifiedToken::from_claims(claims(json!({"aud": "https://api.example"})));
        assert_eq!(token.audience, vec!["https://api.example".to_string()]);
        assert!(token.subject.is_none());
    }
}
