//! JSON error responses and the status each domain failure maps to.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::{
    auth::{Deny, SessionError},
    books,
};

#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    basic_challenge: bool,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            basic_challenge: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// 401 asking the client for Basic credentials.
    #[must_use]
    pub fn basic_auth_required() -> Self {
        Self {
            basic_challenge: true,
            ..Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
        }
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response();

        if self.basic_challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Basic realm="folio""#),
            );
        }

        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("rejected request body: {}", rejection.body_text());
        Self::bad_request(format!("unable to parse request body: {}", rejection.body_text()))
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        if err.is_internal() {
            error!("session operation failed: {err}");
            return Self::internal();
        }

        let status = match err {
            SessionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SessionError::EmailTaken => StatusCode::CONFLICT,
            SessionError::UserNotFound => StatusCode::NOT_FOUND,
            SessionError::Blocked | SessionError::UnknownRole(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        };
        debug!("session request refused: {err}");
        Self::new(status, err.to_string())
    }
}

impl From<Deny> for ApiError {
    fn from(deny: Deny) -> Self {
        let status = match deny {
            Deny::Malformed | Deny::Expired => StatusCode::UNAUTHORIZED,
            Deny::Forbidden => StatusCode::FORBIDDEN,
        };
        Self::new(status, deny.to_string())
    }
}

impl From<books::Error> for ApiError {
    fn from(err: books::Error) -> Self {
        match err {
            books::Error::Invalid(message) => Self::bad_request(message),
            books::Error::NotFound => Self::not_found("book with the given ID is not found"),
            books::Error::Database(err) => {
                error!("book storage failed: {err}");
                Self::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{credentials::UnknownRole, store};

    #[test]
    fn session_errors_map_to_statuses() {
        let cases = [
            (SessionError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (SessionError::EmailTaken, StatusCode::CONFLICT),
            (SessionError::UserNotFound, StatusCode::NOT_FOUND),
            (SessionError::BadPassword, StatusCode::UNAUTHORIZED),
            (SessionError::Blocked, StatusCode::FORBIDDEN),
            (
                SessionError::UnknownRole(UnknownRole("root".into())),
                StatusCode::FORBIDDEN,
            ),
            (SessionError::InvalidToken, StatusCode::UNAUTHORIZED),
            (SessionError::RefreshExpired, StatusCode::UNAUTHORIZED),
            (SessionError::StaleRefresh, StatusCode::UNAUTHORIZED),
            (SessionError::Task("join".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                SessionError::Store(store::Error::Redis(redis::RedisError::from((
                    redis::ErrorKind::IoError,
                    "down",
                )))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn deny_maps_to_statuses() {
        assert_eq!(ApiError::from(Deny::Malformed).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(Deny::Expired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(Deny::Forbidden).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(books::Error::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal server error");
    }

    #[test]
    fn basic_challenge_sets_header() {
        let response = ApiError::basic_auth_required().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
