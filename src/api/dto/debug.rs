/*
 * Responsibility
 * - GET /debug/token の response DTO
 * - claims をそのまま返すので本番公開は想定しない (トラブルシュート専用)
 */
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::auth::authorities::AuthoritySet;
use crate::services::auth::claims::Claims;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTokenResponse {
    pub path: &'static str,
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Masked, never the full token.
    pub authorization_header: String,
    pub principal: String,
    pub authorities: AuthoritySet,
    pub subject: Option<String>,
    pub audience: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub issued_at: Option<DateTime<Utc>>,
    pub claims: Claims,
}
