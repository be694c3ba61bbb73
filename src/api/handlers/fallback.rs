use crate::error::AppError;

/// Unknown routes. Reached only after the gate accepted the token.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
