use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest, VerifyResponse},
        error::AuthError,
        extractors::{AuthBody, BearerToken},
        services,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/verify", post(verify))
        .route("/auth/logout", post(logout))
        .route("/auth/hash-passwords", post(hash_passwords))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AuthBody(payload): AuthBody<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    services::login(&state, payload).await.map(Json)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AuthBody(payload): AuthBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let res = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<VerifyResponse>, AuthError> {
    let user = services::verify_token(&state, token.as_deref()).await?;
    Ok(Json(VerifyResponse {
        success: true,
        user,
    }))
}

pub async fn logout() -> Json<MessageResponse> {
    Json(services::logout())
}

#[instrument(skip(state))]
pub async fn hash_passwords(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AuthError> {
    services::hash_passwords(&state).await.map(Json)
}
