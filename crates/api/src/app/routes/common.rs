use core::str::FromStr;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::response::IntoResponse;

use crate::app::errors;

/// Entity identifier taken from the single `:id` path segment.
///
/// A segment that does not parse (identifiers are digits only) is treated as
/// an unmatched route rather than a bad request.
pub struct EntityPath<I>(pub I);

#[axum::async_trait]
impl<S, I> FromRequestParts<S> for EntityPath<I>
where
    S: Send + Sync,
    I: FromStr + Send,
{
    type Rejection = axum::response::Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        raw.parse::<I>()
            .map(EntityPath)
            .map_err(|_| errors::no_route(&parts.method, parts.uri.path()))
    }
}
