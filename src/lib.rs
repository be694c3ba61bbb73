//! Resource server in front of a hosted identity provider (Auth0-style).
//!
//! Bearer JWTs are verified against the provider's published keys, claims are
//! mapped to authorities, and a per-route policy decides access. The crate also
//! carries a client for the provider's authorization-code exchange.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
