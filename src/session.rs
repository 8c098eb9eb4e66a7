//! Authenticated-session bookkeeping and one-shot flash messages.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::templates::PageError;
use crate::users::auth::session_auth_hash;
use crate::users::{User, UserRepository};
use crate::AppState;

pub const USER_KEY: &str = "user";
const MESSAGES_KEY: &str = "_messages";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: i64,
    pub username: String,
    pub is_superuser: bool,
    /// Keyed digest of the password hash at login time.
    pub auth_hash: String,
}

impl UserSession {
    pub fn for_user(state: &AppState, user: &User) -> Result<Self, PageError> {
        Ok(Self {
            user_id: user.id,
            username: user.username.clone(),
            is_superuser: user.is_superuser,
            auth_hash: session_auth_hash(&state.config.secret_key, &user.password_hash)?,
        })
    }
}

/// Starts an authenticated session, rotating the session id.
pub async fn log_in(session: &Session, state: &AppState, user: &User) -> Result<(), PageError> {
    session.cycle_id().await?;
    session.insert(USER_KEY, UserSession::for_user(state, user)?).await?;
    Ok(())
}

/// Re-stamps the session after the user's own password change so it stays valid.
pub async fn refresh_auth_hash(
    session: &Session,
    state: &AppState,
    user: &User,
) -> Result<(), PageError> {
    session.insert(USER_KEY, UserSession::for_user(state, user)?).await?;
    Ok(())
}

/// The logged-in user, or `None` for anonymous and invalidated sessions.
///
/// A session pointing at a deleted user, or stamped with a password hash that
/// has since changed, is flushed.
pub async fn current_user(session: &Session, state: &AppState) -> Result<Option<User>, PageError> {
    let Some(user_session) = session.get::<UserSession>(USER_KEY).await? else {
        return Ok(None);
    };

    let repo = UserRepository::new(state.db.clone());
    let user = repo.find_by_id(user_session.user_id).await?;

    let valid = match &user {
        Some(user) => {
            session_auth_hash(&state.config.secret_key, &user.password_hash)?
                == user_session.auth_hash
        }
        None => false,
    };

    if !valid {
        warn!(user_id = user_session.user_id, "Discarding stale session");
        session.flush().await?;
        return Ok(None);
    }

    Ok(user)
}

/// Like [`current_user`] but redirects anonymous visitors to the login page,
/// remembering where they were headed.
pub async fn require_login(
    session: &Session,
    state: &AppState,
    path: &str,
) -> Result<User, PageError> {
    match current_user(session, state).await? {
        Some(user) => Ok(user),
        None => {
            debug!(path, "Login required");
            Err(PageError::LoginRequired(path.to_string()))
        }
    }
}

/// Superuser-only views send everyone else back to the login page.
pub async fn require_superuser(
    session: &Session,
    state: &AppState,
    path: &str,
) -> Result<User, PageError> {
    let user = require_login(session, state, path).await?;
    if user.is_superuser {
        Ok(user)
    } else {
        warn!(user_id = user.id, path, "Superuser access denied");
        Err(PageError::LoginRequired(path.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Success,
    Error,
}

impl MessageLevel {
    pub fn as_str(&self) -> &str {
        match self {
            MessageLevel::Success => "success",
            MessageLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: MessageLevel,
    pub text: String,
}

/// Queues a message for the next rendered page.
pub async fn flash(
    session: &Session,
    level: MessageLevel,
    text: impl Into<String>,
) -> Result<(), PageError> {
    let mut messages: Vec<FlashMessage> = session.get(MESSAGES_KEY).await?.unwrap_or_default();
    messages.push(FlashMessage {
        level,
        text: text.into(),
    });
    session.insert(MESSAGES_KEY, messages).await?;
    Ok(())
}

/// Drains queued messages.
pub async fn take_messages(session: &Session) -> Result<Vec<FlashMessage>, PageError> {
    Ok(session
        .remove::<Vec<FlashMessage>>(MESSAGES_KEY)
        .await?
        .unwrap_or_default())
}

/// Only same-site absolute paths are followed after login.
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would become
/// `//host`; any control character disqualifies the value.
pub fn safe_next(next: &str) -> Option<&str> {
    let next = next.trim();
    if next.chars().any(char::is_control) || next.contains('\\') {
        return None;
    }
    let mut chars = next.chars();
    match (chars.next(), chars.next()) {
        (Some('/'), Some('/')) => None,
        (Some('/'), _) => Some(next),
        _ => None,
    }
}
