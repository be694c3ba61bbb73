use serde::{Deserialize, Serialize};

/// Query of the public authorization callback (`/authorized?code=...`).
#[derive(Debug, Deserialize)]
pub struct AuthorizedQuery {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorizedResponse {
    pub code: String,
}
