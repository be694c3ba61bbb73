//! access token (IdP 発行の JWT) 検証 → 認可 → AuthCtx を extensions に入れる
//!
//! 1. RoutePolicy で Public なら検証せずに通す
//! 2. `Authorization: Bearer <jwt>` を取り出す (無ければ 401)
//! 3. 署名 / iss / exp / nbf / aud を検証 (失敗は 401)
//! 4. claims から authorities を導出し、route の要求を満たさなければ 403

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::extractors::AuthCtx;
use crate::error::{AppError, AuthFailure};
use crate::middleware::auth::policy::Access;
use crate::middleware::bearer_auth::{authorization_header, bearer_token, mask_authorization};
use crate::state::AppState;

/// Router 全体 (fallback 含む) に認証/認可を掛ける。
///
/// 例：
/// ```ignore
/// let router = api::routes();
/// let router = middleware::auth::access::apply(router, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let access = state.policy.access_for(&method, &path);
    if *access == Access::Public {
        return Ok(next.run(req).await);
    }

    let authorization = authorization_header(req.headers());
    let Some(token) = authorization.and_then(bearer_token) else {
        tracing::warn!(
            %method,
            %path,
            token_present = authorization.is_some(),
            "authentication required"
        );
        return Err(AppError::Unauthorized(AuthFailure::MissingToken));
    };

    let verified = match state.auth.verify(token).await {
        Ok(verified) => verified,
        Err(err) => {
            tracing::warn!(
                %method,
                %path,
                token = %authorization.map(mask_authorization).unwrap_or_default(),
                error = %err,
                "access token verification failed"
            );
            return Err(AppError::Unauthorized(err.failure()));
        }
    };

    let authorities = state.auth.authorities(&verified);
    if !access.permits(&authorities) {
        tracing::warn!(
            %method,
            %path,
            subject = verified.subject.as_deref().unwrap_or("-"),
            authorities = ?authorities.to_strings(),
            required = ?access,
            "authorization denied"
        );
        return Err(AppError::Forbidden);
    }

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(AuthCtx::new(verified, authorities));

    Ok(next.run(req).await)
}
