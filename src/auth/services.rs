use axum::extract::FromRef;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, PublicUser, RegisterRequest},
        error::AuthError,
        jwt::JwtKeys,
        password::{hash_password, migrate_legacy_passwords, verify_password},
        repo::InsertError,
        repo_types::NewUser,
    },
    state::AppState,
};

/// Treats empty strings like absent fields.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[instrument(skip(state, payload))]
pub async fn login(state: &AppState, payload: LoginRequest) -> Result<AuthResponse, AuthError> {
    let email = present(payload.email.as_deref().map(normalize_email));
    let (Some(email), Some(password)) = (email, present(payload.password)) else {
        return Err(AuthError::MissingCredentials);
    };

    info!(email = %email, "login attempt");

    let Some(user) = state.store.find_active_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&password, &user, &state.config.legacy) {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let public = PublicUser::from(&user);
    let token = JwtKeys::from_ref(state).sign(&public)?;

    if let Err(e) = state.store.touch_last_login(user.id).await {
        warn!(error = %e, user_id = %user.id, "last_login update failed");
    }

    info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok(AuthResponse {
        success: true,
        token,
        user: public,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    state: &AppState,
    payload: RegisterRequest,
) -> Result<AuthResponse, AuthError> {
    let email = present(payload.email.as_deref().map(normalize_email));
    let (Some(email), Some(password), Some(full_name), Some(role)) = (
        email,
        present(payload.password),
        present(payload.full_name),
        present(payload.role),
    ) else {
        return Err(AuthError::MissingFields);
    };

    let password_hash = hash_password(&password)?;

    let user = match state
        .store
        .insert(NewUser {
            email,
            full_name,
            role: role.into(),
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(InsertError::EmailTaken) => {
            warn!("email already registered");
            return Err(AuthError::EmailTaken);
        }
        Err(InsertError::Store(e)) => {
            error!(error = %e, "create user failed");
            return Err(AuthError::Server(e));
        }
    };

    let public = PublicUser::from(&user);
    let token = JwtKeys::from_ref(state).sign(&public)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        success: true,
        token,
        user: public,
    })
}

/// Tokens are not tracked server side; the client discards its copy.
pub fn logout() -> MessageResponse {
    MessageResponse::ok("Logged out successfully")
}

#[instrument(skip_all)]
pub async fn verify_token(state: &AppState, token: Option<&str>) -> Result<PublicUser, AuthError> {
    let token = token.ok_or(AuthError::MissingToken)?;

    let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
        warn!(error = %e, "token verification failed");
        AuthError::TokenInvalid
    })?;

    // Every failure on this path surfaces as an invalid token, store errors included.
    let user = match state.store.find_active_by_id(claims.id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(user_id = %claims.id, "token user missing or inactive");
            return Err(AuthError::UserNotFound);
        }
        Err(e) => {
            error!(error = %e, user_id = %claims.id, "token user lookup failed");
            return Err(AuthError::TokenInvalid);
        }
    };

    Ok(PublicUser::from(&user))
}

#[instrument(skip(state))]
pub async fn hash_passwords(state: &AppState) -> Result<MessageResponse, AuthError> {
    let migrated = migrate_legacy_passwords(state.store.as_ref(), &state.config.legacy).await?;
    info!(migrated, "legacy password migration finished");
    Ok(MessageResponse::ok("Passwords hashed successfully"))
}
