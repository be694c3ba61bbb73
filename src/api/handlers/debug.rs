/*
 * Responsibility
 * - GET /debug/token (トラブルシュート用)
 * - trace id / masked Authorization / principal / authorities / claims を返す
 */
use axum::{Json, http::HeaderMap};
use chrono::Utc;

use crate::api::dto::debug::DebugTokenResponse;
use crate::api::extractors::AuthCtxExtractor;
use crate::middleware::bearer_auth::{authorization_header, mask_authorization};
use crate::middleware::http::REQUEST_ID_HEADER;

use super::trace_inbound;

pub const DEBUG_TRACE_HEADER: &str = "x-debug-trace";
const DEFAULT_TRACE_ID: &str = "frontend";

pub async fn debug_token(
    headers: HeaderMap,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Json<DebugTokenResponse> {
    trace_inbound("GET", "/debug/token", &headers, &ctx);

    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let payload = DebugTokenResponse {
        path: "/debug/token",
        timestamp: Utc::now(),
        trace_id: header_str(DEBUG_TRACE_HEADER).unwrap_or_else(|| DEFAULT_TRACE_ID.to_string()),
        request_id: header_str(REQUEST_ID_HEADER),
        authorization_header: authorization_header(&headers)
            .map(mask_authorization)
            .unwrap_or_else(|| "none".to_string()),
        principal: ctx.principal,
        authorities: ctx.authorities,
        subject: ctx.token.subject,
        audience: ctx.token.audience,
        expires_at: ctx.token.expires_at,
        issued_at: ctx.token.issued_at,
        claims: ctx.token.claims,
    };

    tracing::info!(
        trace_id = %payload.trace_id,
        principal = %payload.principal,
        authorities = ?payload.authorities.to_strings(),
        "debug token"
    );

    Json(payload)
}
