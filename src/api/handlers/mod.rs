/*
 * Responsibility
 * - route handler 群
 * - 受信ログ (method/path/token 有無/masked token) の共通化
 */
pub mod authorized;
pub mod debug;
pub mod fallback;
pub mod messages;

use axum::http::HeaderMap;

use crate::api::extractors::AuthCtx;
use crate::middleware::bearer_auth::{authorization_header, mask_authorization};

fn trace_inbound(method: &str, path: &str, headers: &HeaderMap, ctx: &AuthCtx) {
    let authorization = authorization_header(headers);
    tracing::info!(
        method,
        path,
        authorization_present = authorization.is_some(),
        "request received"
    );

    tracing::info!(
        aud = ?ctx.token.audience,
        subject = ctx.token.subject.as_deref().unwrap_or("-"),
        exp = ?ctx.token.expires_at,
        "jwt"
    );
    tracing::debug!(claims = ?ctx.token.claims, "jwt claims");

    if let Some(authorization) = authorization {
        tracing::info!(token = %mask_authorization(authorization), "token attached");
    }
}
