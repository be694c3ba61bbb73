pub mod authorized;
pub mod debug;
pub mod message;
