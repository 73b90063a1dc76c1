use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Caller identity extracted from the `UserId` request header.
///
/// The vault performs no authentication beyond this opaque identifier;
/// every request must be traceable to a user. Add this as a handler
/// parameter to require the header.
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("UserId")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::MissingUserId)?;

        Ok(UserId(user_id.to_string()))
    }
}
