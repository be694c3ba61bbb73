/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - JWT の検証ロジックや authorities の導出は middleware/services 側の責務
 */
use crate::services::auth::authorities::AuthoritySet;
use crate::services::auth::claims::VerifiedToken;

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `principal` は token の `sub` (無ければ "anonymous")
/// - `authorities` は scope / role / permission から導出済みの権限
/// - `token` は検証済み claims 一式 (debug endpoint 用)
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub principal: String,
    pub authorities: AuthoritySet,
    pub token: VerifiedToken,
}

impl AuthCtx {
    pub fn new(token: VerifiedToken, authorities: AuthoritySet) -> Self {
        Self {
            principal: token
                .subject
                .clone()
                .unwrap_or_else(|| "anonymous".to_string()),
            authorities,
            token,
        }
    }
}
