pub mod auth;
pub mod idp;
