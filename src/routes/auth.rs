//! Acting-user extraction and the role gate.
//!
//! Sessions and credentials are handled upstream; the auth proxy forwards the
//! authenticated user as `x-user-id` and `x-user-role` headers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::booking::Actor;
use crate::error::AppError;
use crate::models::Role;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Authenticated user; rejects with 401 when the headers are missing
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER)
            .and_then(|v| v.trim().parse::<Uuid>().ok())
            .ok_or(AppError::Unauthorized)?;

        let role = match header(USER_ROLE_HEADER) {
            Some(value) => value.parse::<Role>().map_err(|_| AppError::Unauthorized)?,
            None => Role::Guest,
        };

        Ok(CurrentUser(Actor { user_id, role }))
    }
}

/// Authenticated administrator; rejects guests with 403
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(actor) = CurrentUser::from_request_parts(parts, state).await?;
        requires_role(&actor, Role::Admin)?;
        Ok(AdminUser(actor))
    }
}

/// The single capability check used by every gated handler
pub fn requires_role(actor: &Actor, role: Role) -> Result<(), AppError> {
    match (role, actor.role) {
        (Role::Guest, _) | (Role::Admin, Role::Admin) => Ok(()),
        (Role::Admin, Role::Guest) => {
            tracing::warn!(user_id = %actor.user_id, "Admin access refused");
            Err(AppError::Forbidden)
        }
    }
}
