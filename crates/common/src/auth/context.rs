use http::HeaderMap;

use super::{Actor, Role};
use crate::domain::DomainError;

/// Header carrying the authenticated user's id, set by the upstream proxy
pub const USER_ID_HEADER: &str = "x-user-id";
/// Optional display name used in event messages
pub const USER_NAME_HEADER: &str = "x-user-name";
/// Optional role, `admin` or `user`
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, DomainError> {
    match headers.get(name) {
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| DomainError::Unauthenticated(format!("Invalid {} header", name))),
        None => Ok(None),
    }
}

/// Extract the acting user from request headers.
///
/// Authentication happens upstream; this only reads the identity it forwards.
/// A missing user id is rejected, a missing role means a regular user.
pub fn extract_actor(headers: &HeaderMap) -> Result<Actor, DomainError> {
    let user_id = header_value(headers, USER_ID_HEADER)?
        .ok_or_else(|| DomainError::Unauthenticated(format!("Missing {} header", USER_ID_HEADER)))?;

    let display_name = header_value(headers, USER_NAME_HEADER)?.unwrap_or(user_id);

    let role = match header_value(headers, USER_ROLE_HEADER)? {
        Some(raw) => raw.parse::<Role>().map_err(DomainError::Unauthenticated)?,
        None => Role::User,
    };

    Ok(Actor::new(user_id, display_name, role))
}
