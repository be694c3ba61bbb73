//! Per-route authorization policy.
//!
//! Rules are matched on exact method + path, first match wins. Anything without a
//! rule requires a valid token and nothing more.

use axum::http::Method;

use crate::services::auth::authorities::{Authority, AuthoritySet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No token verification at all.
    Public,
    /// Any valid token.
    Authenticated,
    /// Valid token carrying at least one of these authorities.
    AnyOf(Vec<Authority>),
}

impl Access {
    pub fn permits(&self, authorities: &AuthoritySet) -> bool {
        match self {
            Access::Public | Access::Authenticated => true,
            Access::AnyOf(required) => authorities.satisfies_any(required),
        }
    }
}

const AUTHENTICATED: &Access = &Access::Authenticated;

#[derive(Debug, Clone)]
struct Rule {
    method: Method,
    path: String,
    access: Access,
}

#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    rules: Vec<Rule>,
}

impl RoutePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permit_all(self, method: Method, path: &str) -> Self {
        self.rule(method, path, Access::Public)
    }

    pub fn require_any<I>(self, method: Method, path: &str, authorities: I) -> Self
    where
        I: IntoIterator<Item = Authority>,
    {
        self.rule(method, path, Access::AnyOf(authorities.into_iter().collect()))
    }

    fn rule(mut self, method: Method, path: &str, access: Access) -> Self {
        self.rules.push(Rule {
            method,
            path: path.to_string(),
            access,
        });
        self
    }

    pub fn access_for(&self, method: &Method, path: &str) -> &Access {
        self.rules
            .iter()
            .find(|rule| rule.method == *method && rule.path == path)
            .map(|rule| &rule.access)
            .unwrap_or(AUTHENTICATED)
    }
}

/// The routes this service exposes.
pub fn default_policy() -> RoutePolicy {
    RoutePolicy::new()
        .permit_all(Method::GET, "/authorized")
        .require_any(
            Method::GET,
            "/list",
            [Authority::scope("read"), Authority::role("admin")],
        )
        .require_any(
            Method::POST,
            "/create",
            [Authority::scope("write"), Authority::role("admin")],
        )
}
