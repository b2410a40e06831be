use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer, cookie::SameSite};

use crate::{
    AppState,
    config::Config,
    entities::user,
    error::{AppError, AppResult},
    store::Store,
};

pub const SESSION_COOKIE: &str = "session";
const USER_ID_KEY: &str = "user_id";

/// Cookie-backed sessions over `store`. Sessions expire after `SESSION_TTL_HOURS`
/// without a request.
pub fn session_layer(store: MemoryStore, config: &Config) -> SessionManagerLayer<MemoryStore> {
    let ttl = time::Duration::seconds(config.session_ttl_hours.saturating_mul(3600));

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_path("/")
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.session_cookie_secure)
        .with_expiry(Expiry::OnInactivity(ttl))
}

/// Logs in by username alone and binds the session to the user.
pub async fn authenticate(
    store: &Store,
    session: &Session,
    username: &str,
) -> AppResult<user::Model> {
    let Some(user) = store.find_user_by_username(username).await? else {
        return Err(AppError::InvalidCredentials);
    };

    // Fresh id on every login; a session id the client already held stops resolving.
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;

    tracing::info!(user_id = user.id, "session started");
    Ok(user)
}

/// The user id bound to the session, if any. Missing, unknown and expired
/// sessions all read as `None`.
pub async fn current_user(session: &Session) -> AppResult<Option<i32>> {
    Ok(session.get::<i32>(USER_ID_KEY).await?)
}

/// Ends the session. Requests without a session pass through unchanged.
pub async fn end_session(session: &Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}

/// The logged-in user. Rejects with 401 when the session is missing, unknown,
/// expired, or points at a user that no longer exists.
#[derive(Clone, Debug)]
pub struct AuthUser(pub user::Model);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))?;

        let user_id = current_user(&session).await?.ok_or(AppError::Unauthenticated)?;
        let user = state.store.find_user(user_id).await?.ok_or(AppError::Unauthenticated)?;
        Ok(Self(user))
    }
}
