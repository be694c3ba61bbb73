/*
 * Responsibility
 * - GET /list (固定の 1 件を返す)
 * - POST /create (受け取った message をそのまま返す)
 */
use axum::{Json, http::HeaderMap};

use crate::api::dto::message::Message;
use crate::api::extractors::{AuthCtxExtractor, JsonBody};

use super::trace_inbound;

pub const LIST_CONTENT: &str = "Lista de varios elementos";

pub async fn list(
    headers: HeaderMap,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Json<Vec<Message>> {
    trace_inbound("GET", "/list", &headers, &ctx);
    Json(vec![Message::new(LIST_CONTENT)])
}

pub async fn create(
    headers: HeaderMap,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    JsonBody(message): JsonBody<Message>,
) -> Json<Message> {
    trace_inbound("POST", "/create", &headers, &ctx);
    tracing::info!(payload = ?message, "payload received on /create");
    Json(message)
}
