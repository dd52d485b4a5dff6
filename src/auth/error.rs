//! Errors returned by the auth service and their HTTP rendering.

use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,

    #[error("all fields are required")]
    MissingFields,

    #[error("malformed request body: {0}")]
    InvalidBody(String),

    /// Unknown email and wrong password both end up here.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already in use")]
    EmailTaken,

    #[error("missing bearer token")]
    MissingToken,

    #[error("token rejected")]
    TokenInvalid,

    #[error("token user not found or inactive")]
    UserNotFound,

    #[error("server error: {0}")]
    Server(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::MissingFields
            | AuthError::InvalidBody(_)
            | AuthError::EmailTaken => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::TokenInvalid
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients. Token failures share one message.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "Email and password are required",
            AuthError::MissingFields => "All fields are required",
            AuthError::InvalidBody(_) => "Invalid request body",
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::EmailTaken => "This email is already in use",
            AuthError::MissingToken | AuthError::TokenInvalid | AuthError::UserNotFound => {
                "Invalid token"
            }
            AuthError::Server(_) => "Server error",
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "json body rejected");
        AuthError::InvalidBody(rejection.body_text())
    }
}

impl From<FormRejection> for AuthError {
    fn from(rejection: FormRejection) -> Self {
        warn!(error = %rejection.body_text(), "form body rejected");
        AuthError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Server(e) = &self {
            error!(error = %e, "request failed");
        }
        let body = Json(json!({ "success": false, "message": self.public_message() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_share_status_and_message() {
        let kinds = [
            AuthError::MissingToken,
            AuthError::TokenInvalid,
            AuthError::UserNotFound,
        ];
        for kind in kinds {
            assert_eq!(kind.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(kind.public_message(), "Invalid token");
        }
    }

    #[test]
    fn server_error_hides_cause() {
        let err = AuthError::from(anyhow::anyhow!("connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Server error");
    }

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(AuthError::MissingCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::MissingFields.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::EmailTaken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::InvalidBody("expected a string".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
    }
}
