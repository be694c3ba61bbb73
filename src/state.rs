/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: AuthService (token 検証 + authorities 導出)
 *   - policy: RoutePolicy (route ごとの認可要求)
 *   - token_exchange: TokenExchangeClient (authorization code → tokens)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - 起動時に一度だけ組み立て、以降は read-only
 */
use std::sync::Arc;

use crate::middleware::auth::policy::RoutePolicy;
use crate::services::{auth::AuthService, idp::TokenExchangeClient};

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub policy: Arc<RoutePolicy>,
    pub token_exchange: Arc<TokenExchangeClient>,
}

impl AppState {
    pub fn new(
        auth: Arc<AuthService>,
        policy: Arc<RoutePolicy>,
        token_exchange: Arc<TokenExchangeClient>,
    ) -> Self {
        Self {
            auth,
            policy,
            token_exchange,
        }
    }
}
