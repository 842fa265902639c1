use axum::{
    extract::{FromRequestParts, State},
    response::IntoResponse,
    routing::{get, post},
    Json, RequestPartsExt,
};
use axum_extra::TypedHeader;
use cookie::{Cookie, Expiration, SameSite};
use garde::Validate;
use headers::{authorization::Bearer, Authorization};
use http::{request::Parts, StatusCode};
use novela_dal::user::{CreateUser, UserIdentity, UserRepository};
use novela_types::claim::ApiClaim;
use serde::Deserialize;
use time::OffsetDateTime;
use tower_cookies::Cookies;
use tracing::{debug, error, info, warn};

use crate::{
    error::{ApiError, ApiResult},
    repository_from_request,
    state::AppState,
    validate::Garde,
};

pub const TOKEN_COOKIE_NAME: &str = "novela_token";

repository_from_request!(UserRepository);

async fn session_token(parts: &mut Parts) -> Option<String> {
    let header_token = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .ok()
        .map(|h| h.0.token().to_string());
    if header_token.is_some() {
        return header_token;
    }

    match parts.extract::<Cookies>().await {
        Ok(cookies) => cookies.get(TOKEN_COOKIE_NAME).map(|c| c.value().to_string()),
        Err(e) => {
            error!("Cannot get cookies: {}", e.1);
            None
        }
    }
}

/// Authenticated user, moderator flag is always read from database, not from token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserIdentity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).await.ok_or_else(|| {
            debug!("No token found");
            ApiError::unauthenticated()
        })?;
        let claim = state.tokens().validate::<ApiClaim>(&token).map_err(|e| {
            debug!("Failed to validate token: {e}");
            ApiError::Unauthenticated("Invalid or expired session".to_string())
        })?;
        let user_id = claim.user_id().ok_or_else(|| {
            warn!("Token with invalid subject {}", claim.sub);
            ApiError::Unauthenticated("Invalid session".to_string())
        })?;
        let identity = UserRepository::new(state.pool().clone())
            .identity(user_id)
            .await
            .map_err(|e| match e {
                novela_dal::Error::RecordNotFound(_) => {
                    debug!("Token for unknown user {user_id}");
                    ApiError::Unauthenticated("Unknown user".to_string())
                }
                other => other.into(),
            })?;
        Ok(CurrentUser(identity))
    }
}

/// Authenticated user with moderator flag
#[derive(Debug, Clone)]
pub struct ModeratorUser(pub UserIdentity);

impl FromRequestParts<AppState> for ModeratorUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        if identity.is_moderator {
            Ok(ModeratorUser(identity))
        } else {
            warn!("User {} is not moderator", identity.username);
            Err(ApiError::Forbidden)
        }
    }
}

/// Users can only act on their own records
pub fn require_self(identity: &UserIdentity, target_user_id: i64) -> ApiResult<()> {
    if identity.id == target_user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

fn set_session_cookie(state: &AppState, cookies: &Cookies, user_id: i64) -> ApiResult<()> {
    let signed_token = state.tokens().issue(ApiClaim::for_user(user_id))?;
    let cookie = Cookie::build((TOKEN_COOKIE_NAME, signed_token))
        .http_only(true)
        .secure(state.config().secure_cookies)
        .path("/")
        .same_site(SameSite::Lax)
        .expires(Expiration::DateTime(
            OffsetDateTime::now_utc() + state.tokens().default_validity(),
        ));
    cookies.add(cookie.into());
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginCredentials {
    #[garde(length(min = 1, max = 64))]
    pub username: String,
    #[garde(length(min = 1, max = 255))]
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.register(payload).await?;
    set_session_cookie(&state, &cookies, user.id)?;
    info!("Registered user {}", user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    user_registry: UserRepository,
    Garde(Json(credentials)): Garde<Json<LoginCredentials>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry
        .check_password(&credentials.username, &credentials.password)
        .await?;
    set_session_cookie(&state, &cookies, user.id)?;
    debug!("User {} logged in", user.username);
    Ok((StatusCode::OK, Json(user)))
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    cookies.remove(Cookie::build((TOKEN_COOKIE_NAME, "")).path("/").into());
    (
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    )
}

pub async fn me(
    CurrentUser(identity): CurrentUser,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.get(identity.id).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Builds authentication router - must be nested on /auth path!
pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
