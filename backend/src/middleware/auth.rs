//! Authentication middleware
//!
//! Decodes an optional bearer token once per request. Handlers then pick
//! [`CurrentUser`] (token required) or [`MaybeUser`] (anonymous allowed).

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::AuthService;
use crate::AppState;
use shared::UserRole;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_buyer(&self) -> bool {
        self.role == UserRole::Buyer
    }

    /// Reject the request unless the user holds `role`
    pub fn require_role(&self, role: UserRole) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// Why a supplied token was not accepted; kept for the [`CurrentUser`] rejection
#[derive(Clone, Copy, Debug)]
enum TokenRejection {
    Expired,
    Invalid,
}

/// Decode the bearer token, if any, into an [`AuthUser`] request extension
///
/// Requests without a token pass through untouched. A bad token is not an
/// error here: public endpoints treat the caller as anonymous, protected
/// ones report the failure through [`CurrentUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        let auth_service = AuthService::new(state.db.clone(), &state.config);
        match auth_service.validate_token(bearer.token()) {
            Ok(claims) => match Uuid::parse_str(&claims.sub) {
                Ok(user_id) => {
                    request.extensions_mut().insert(AuthUser {
                        user_id,
                        email: claims.email,
                        role: claims.role,
                    });
                }
                Err(_) => {
                    request.extensions_mut().insert(TokenRejection::Invalid);
                }
            },
            Err(AppError::TokenExpired) => {
                request.extensions_mut().insert(TokenRejection::Expired);
            }
            Err(e) => {
                tracing::debug!("Rejected bearer token: {}", e);
                request.extensions_mut().insert(TokenRejection::Invalid);
            }
        }
    }

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(CurrentUser(user.clone()));
        }

        let error = match parts.extensions.get::<TokenRejection>() {
            Some(TokenRejection::Expired) => AppError::TokenExpired,
            Some(TokenRejection::Invalid) => AppError::InvalidToken,
            None => AppError::Unauthorized("Authentication required".to_string()),
        };
        Err(error.into_response())
    }
}

/// Extractor for endpoints that serve anonymous and signed-in callers alike
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "u@example.md".into(),
            role,
        }
    }

    #[test]
    fn test_require_role() {
        assert!(user(UserRole::Seller).require_role(UserRole::Seller).is_ok());
        assert!(matches!(
            user(UserRole::Buyer).require_role(UserRole::Seller),
            Err(AppError::InsufficientPermissions)
        ));
        assert!(user(UserRole::Buyer).is_buyer());
        assert!(!user(UserRole::Seller).is_buyer());
    }
}
