/*
 * Responsibility
 * - URL 構造を定義
 * - 認証/認可の要求は middleware::auth::policy 側 (route ごとの宣言はそちらに置く)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::handlers::{
    authorized::authorized,
    debug::debug_token,
    fallback::not_found,
    messages::{create, list},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/authorized", get(authorized))
        .route("/list", get(list))
        .route("/create", post(create))
        .route("/debug/token", get(debug_token))
        .fallback(not_found)
}
