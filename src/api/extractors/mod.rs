pub mod auth_ctx;
pub mod payload;

pub use auth_ctx::{AuthCtx, AuthCtxExtractor};
pub use payload::{JsonBody, QueryParams};
