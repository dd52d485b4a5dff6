use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::CONTENT_TYPE, request::Parts},
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::auth::error::AuthError;

/// Request body read as JSON or as an urlencoded form, depending on `Content-Type`.
///
/// Any other or missing content type yields `T::default()`, so absent fields
/// are reported by the service. Malformed bodies become [`AuthError::InvalidBody`].
pub struct AuthBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AuthBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(body) = Form::<T>::from_request(req, state).await?;
            Ok(AuthBody(body))
        } else if content_type.contains("json") {
            let Json(body) = Json::<T>::from_request(req, state).await?;
            Ok(AuthBody(body))
        } else {
            Ok(AuthBody(T::default()))
        }
    }
}

/// Raw bearer token from the `Authorization` header, if one was sent.
///
/// The header value is split on whitespace and the second word is taken;
/// the scheme word itself is not checked.
pub struct BearerToken(pub Option<String>);

pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    header.split_whitespace().nth(1)
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(String::from);
        Ok(BearerToken(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_second_word() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer   abc"), Some("abc"));
        assert_eq!(bearer_token("Token abc"), Some("abc"));
    }

    #[test]
    fn missing_second_word_is_none() {
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token(""), None);
    }
}
