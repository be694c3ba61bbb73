pub mod access_jwt;
pub mod authorities;
pub mod claims;
pub mod factory;
pub mod jwks;

pub use access_jwt::{AccessJwtError, AuthService};
pub use factory::build_auth_service;
