/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body / WWW-Authenticate)
 * - token exchange / config の error を統一的に変換
 */
use std::fmt;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::idp::ExchangeError;

/// Why a request failed authentication (401).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    InvalidToken,
    AudienceMissing,
}

impl AuthFailure {
    fn code(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "UNAUTHORIZED",
            AuthFailure::InvalidToken => "INVALID_TOKEN",
            AuthFailure::AudienceMissing => "AUDIENCE_MISSING",
        }
    }

    fn www_authenticate(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "Bearer",
            AuthFailure::InvalidToken => {
                r#"Bearer error="invalid_token", error_description="The access token is invalid""#
            }
            AuthFailure::AudienceMissing => {
                r#"Bearer error="invalid_token", error_description="The required audience is missing from the token""#
            }
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::MissingToken => write!(f, "authentication required"),
            AuthFailure::InvalidToken => write!(f, "invalid access token"),
            AuthFailure::AudienceMissing => {
                write!(f, "the required audience is missing from the token")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unauthorized(AuthFailure),

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    BadGateway(String),

    #[error("internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponseBody {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Unauthorized(failure) => (StatusCode::UNAUTHORIZED, failure.code()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY"),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };

        let challenge = match &self {
            AppError::Unauthorized(failure) => Some(failure.www_authenticate()),
            AppError::Forbidden => Some(r#"Bearer error="insufficient_scope""#),
            _ => None,
        };

        let body = ErrorResponseBody {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(challenge) = challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(challenge),
            );
        }
        response
    }
}

impl From<ConfigError> for AppError {
    fn from(_: ConfigError) -> Self {
        AppError::Internal
    }
}

impl From<ExchangeError> for AppError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::InvalidArgument(msg) => AppError::InvalidRequest(msg.to_string()),
            ExchangeError::UpstreamRejected { summary, .. } => AppError::BadGateway(format!(
                "identity provider rejected the token exchange: {summary}"
            )),
            ExchangeError::UpstreamUnreachable(_) => AppError::BadGateway(
                "could not reach the identity provider token endpoint".to_string(),
            ),
            ExchangeError::Configuration(_) | ExchangeError::HttpClient(_) => AppError::Internal,
        }
    }
}
