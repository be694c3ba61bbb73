/*
 * Responsibility
 * - axum の Query / Json を包み、rejection を AppError::InvalidRequest (400) に揃える
 * - rejection の詳細は warn ログにだけ残し、レスポンスには出さない
 */
use axum::extract::{FromRequest, FromRequestParts, Json, Query, Request};
use axum::http::{Method, request::Parts};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Query<T>` with the crate's JSON error contract.
pub struct QueryParams<T>(pub T);

/// `Json<T>` with the crate's JSON error contract.
pub struct JsonBody<T>(pub T);

fn invalid_request(method: &Method, path: &str, detail: &str, message: &str) -> AppError {
    tracing::warn!(%method, path, detail, "request rejected: {message}");
    AppError::InvalidRequest(message.to_string())
}

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(invalid_request(
                &parts.method,
                parts.uri.path(),
                &rejection.body_text(),
                "missing or malformed query parameters",
            )),
        }
    }
}

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(invalid_request(
                &method,
                &path,
                &rejection.body_text(),
                "malformed JSON body",
            )),
        }
    }
}
