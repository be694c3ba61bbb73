/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth (認証/認可 gate), bearer_auth (ヘッダ抽出/マスク), cors, http
 */
pub mod auth;
pub mod bearer_auth;
pub mod cors;
pub mod http;
