/*
 * Responsibility
 * - GET /authorized (public な authorization callback)
 * - 受け取った code をそのまま返すだけ。token exchange はここでは呼ばない
 */
use axum::{Json, http::HeaderMap};

use crate::api::dto::authorized::{AuthorizedQuery, AuthorizedResponse};
use crate::api::extractors::QueryParams;
use crate::middleware::bearer_auth::authorization_header;

pub async fn authorized(
    headers: HeaderMap,
    QueryParams(query): QueryParams<AuthorizedQuery>,
) -> Json<AuthorizedResponse> {
    tracing::info!(
        token_present = authorization_header(&headers).is_some(),
        "public request on /authorized"
    );
    Json(AuthorizedResponse { code: query.code })
}
