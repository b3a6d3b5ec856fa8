//! Account and session endpoints under `/v1/user/sign`.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::types::{RenewRequest, SignInRequest, SignUpRequest, TokensResponse, UserResponse};
use crate::{
    api::{
        error::{ApiError, ErrorBody},
        extract::{bearer_token, ClientAuth},
    },
    auth::SessionManager,
};

#[utoipa::path(
    post,
    path = "/v1/user/sign/up",
    request_body = SignUpRequest,
    responses (
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid email, password or role", body = ErrorBody),
        (status = 401, description = "Missing or wrong client credentials", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    security(("basic_auth" = [])),
    tag = "user",
)]
#[instrument(skip_all)]
pub async fn sign_up(
    headers: HeaderMap,
    Extension(client): Extension<Arc<ClientAuth>>,
    Extension(sessions): Extension<Arc<SessionManager>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    client.check(&headers)?;
    let Json(request) = payload?;

    let user = sessions
        .sign_up(&request.email, &request.password, &request.user_role)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    post,
    path = "/v1/user/sign/in",
    request_body = SignInRequest,
    responses (
        (status = 200, description = "Token pair issued", body = TokensResponse),
        (status = 400, description = "Unparseable body", body = ErrorBody),
        (status = 401, description = "Wrong password or client credentials", body = ErrorBody),
        (status = 403, description = "User blocked or role not registered", body = ErrorBody),
        (status = 404, description = "No user with that email", body = ErrorBody),
    ),
    security(("basic_auth" = [])),
    tag = "user",
)]
#[instrument(skip_all)]
pub async fn sign_in(
    headers: HeaderMap,
    Extension(client): Extension<Arc<ClientAuth>>,
    Extension(sessions): Extension<Arc<SessionManager>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<TokensResponse>, ApiError> {
    client.check(&headers)?;
    let Json(request) = payload?;

    let pair = sessions.sign_in(&request.email, &request.password).await?;

    Ok(Json(pair.into()))
}

#[utoipa::path(
    post,
    path = "/v1/user/sign/out",
    responses (
        (status = 204, description = "Refresh token forgotten"),
        (status = 400, description = "Missing bearer token", body = ErrorBody),
        (status = 401, description = "Token does not verify", body = ErrorBody),
        (status = 500, description = "Refresh store unavailable", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "user",
)]
#[instrument(skip_all)]
pub async fn sign_out(
    headers: HeaderMap,
    Extension(sessions): Extension<Arc<SessionManager>>,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)?;

    sessions.sign_out(token).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/user/sign/renew",
    request_body = RenewRequest,
    responses (
        (status = 200, description = "New token pair", body = TokensResponse),
        (status = 400, description = "Missing bearer token or body", body = ErrorBody),
        (status = 401, description = "Invalid, expired or superseded token", body = ErrorBody),
        (status = 403, description = "User blocked or role not registered", body = ErrorBody),
        (status = 404, description = "User no longer exists", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "user",
)]
#[instrument(skip_all)]
pub async fn renew(
    headers: HeaderMap,
    Extension(sessions): Extension<Arc<SessionManager>>,
    payload: Result<Json<RenewRequest>, JsonRejection>,
) -> Result<Json<TokensResponse>, ApiError> {
    let access = bearer_token(&headers)?;
    let Json(request) = payload?;

    let pair = sessions.renew(access, &request.refresh_token).await?;

    Ok(Json(pair.into()))
}
