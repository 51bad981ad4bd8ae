use axum::extract::FromRequestParts;
use common::auth::{extract_actor, Actor};
use common::rest::ApiError;
use http::request::Parts;

/// The authenticated actor, read from the trusted upstream headers
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentActor(extract_actor(&parts.headers)?))
    }
}
