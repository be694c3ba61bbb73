/*
 * Responsibility
 * - Authorization ヘッダから Bearer トークンを取り出す
 * - ログ / debug 出力用にトークンをマスクする (全体は絶対に出さない)
 */
use axum::http::{HeaderMap, header};

const BEARER_PREFIX: &str = "Bearer ";

/// `Authorization` header value, if present and valid UTF-8.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Token part of a `Bearer` credential. The scheme is matched case-insensitively.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Masked form of an `Authorization` header, safe for logs.
///
/// - not `Bearer ...` → `"no bearer"`
/// - token of 16 chars or less → as is
/// - longer → first 8 + `...` + last 8
pub fn mask_authorization(authorization: &str) -> String {
    let Some(token) = authorization.strip_prefix(BEARER_PREFIX) else {
        return "no bearer".to_string();
    };

    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 16 {
        return token.to_string();
    }

    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{head}...{tail}")
}
