use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    repository::RepositoryState,
};

/// Header accepted in `Env::Local` to authenticate as a stored user without a token.
pub const LOCAL_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload expected inside the bearer JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, looked up in `users`.
    pub sub: Uuid,
    /// Expiration time (seconds since epoch). Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an argument to
/// require authentication, then check `is_superuser` for admin-only operations.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub is_superuser: bool,
}

/// Resolution order:
/// 0. A `Viewer` already resolved for this request (stored by the access middleware).
/// 1. `Env::Local` only: `x-user-id` holding the UUID of a stored user.
/// 2. `Authorization: Bearer <jwt>`, signature and `exp` checked against the configured secret.
/// 3. The token subject must still exist in the repository.
///
/// Any failure rejects with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(Viewer(resolved)) = parts.extensions.get::<Viewer>() {
            return resolved.clone().ok_or(StatusCode::UNAUTHORIZED);
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get(LOCAL_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await {
                    return Ok(user.into());
                }
            }
            // Bad header or unknown user: fall through to the token flow.
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("rejected bearer token: {:?}", e.kind());
            StatusCode::UNAUTHORIZED
        })?;

        // Deleted users keep valid tokens until expiry; the lookup rejects them.
        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(user.into())
    }
}

impl From<crate::models::User> for AuthUser {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_superuser: user.is_superuser,
        }
    }
}

/// Viewer
///
/// The possibly-anonymous requester. Unlike `AuthUser` this never rejects: missing or
/// invalid credentials resolve to `Viewer(None)`. Used by the access middleware, which
/// must see every request.
///
/// The middleware stores the result in the request extensions; later `Viewer` and `AuthUser`
/// extractions reuse it instead of hitting the repository again.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    pub fn is_superuser(&self) -> bool {
        self.0.as_ref().is_some_and(|user| user.is_superuser)
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|user| user.username.as_str())
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(viewer) = parts.extensions.get::<Viewer>() {
            return Ok(viewer.clone());
        }
        Ok(Self(AuthUser::from_request_parts(parts, state).await.ok()))
    }
}
