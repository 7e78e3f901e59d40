// src/controllers/auth.rs

use validator::Validate;

use crate::{
    api::SocialApi,
    error::AppError,
    models::user::LoginRequest,
    state::Session,
    utils::{jwt::peek_claims, session_store::SessionStore},
};

/// Exchanges credentials for a token pair and builds the session.
///
/// The token pair is persisted so the next start can call [`restore`].
pub async fn login(
    api: &dyn SocialApi,
    store: &SessionStore,
    username: &str,
    password: &str,
) -> Result<Session, AppError> {
    let credentials = LoginRequest {
        username: username.trim().to_string(),
        password: password.to_string(),
    };
    credentials.validate()?;

    let tokens = api.obtain_token(&credentials).await.map_err(|e| {
        tracing::warn!("Login failed for '{}': {}", credentials.username, e);
        e
    })?;
    let claims = peek_claims(&tokens.access)?;

    api.set_token(Some(tokens.access.clone()));
    let session = match open_session(api, &tokens.access, claims.user_id).await {
        Ok(session) => session,
        Err(e) => {
            api.set_token(None);
            return Err(e);
        }
    };

    store.save(&tokens).await?;
    tracing::info!("Logged in as {}", session.current_user.username);
    Ok(session)
}

/// Rebuilds the session from the persisted token pair.
///
/// Returns `Ok(None)` when nothing was saved. An expired or rejected token
/// clears the store and fails with `AuthError`.
pub async fn restore(api: &dyn SocialApi, store: &SessionStore) -> Result<Option<Session>, AppError> {
    let Some(tokens) = store.load().await? else {
        return Ok(None);
    };

    let claims = match peek_claims(&tokens.access) {
        Ok(claims) if !claims.is_expired() => claims,
        Ok(_) => {
            tracing::info!("Saved session has expired");
            store.clear().await?;
            return Err(AppError::AuthError("Session expired".to_string()));
        }
        Err(e) => {
            tracing::warn!("Saved session is unreadable: {}", e);
            store.clear().await?;
            return Err(e);
        }
    };

    api.set_token(Some(tokens.access.clone()));
    match open_session(api, &tokens.access, claims.user_id).await {
        Ok(session) => {
            tracing::debug!("Restored session for {}", session.current_user.username);
            Ok(Some(session))
        }
        Err(e) => {
            api.set_token(None);
            if matches!(e, AppError::AuthError(_)) {
                store.clear().await?;
            }
            Err(e)
        }
    }
}

/// Drops the token from the client and forgets the saved session.
pub async fn logout(api: &dyn SocialApi, store: &SessionStore) -> Result<(), AppError> {
    api.set_token(None);
    store.clear().await?;
    tracing::info!("Logged out");
    Ok(())
}

async fn open_session(
    api: &dyn SocialApi,
    token: &str,
    claimed_id: Option<i64>,
) -> Result<Session, AppError> {
    let current_user = api.current_user().await?;
    if let Some(claimed) = claimed_id.filter(|id| *id != current_user.id) {
        tracing::warn!(
            "Token names user {} but the server returned user {}",
            claimed,
            current_user.id
        );
    }
    Ok(Session {
        token: token.to_string(),
        current_user,
    })
}
