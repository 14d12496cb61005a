//! Authentication endpoints.
//!
//! DESIGN
//! ======
//! `login` is the only call whose 401 means "wrong password" rather than
//! "session expired", so it goes through the client's report-only path and
//! never tears anything down. On success the session is saved and a
//! [`SessionEvent::SignedIn`] is emitted; the caller then builds a fresh
//! client with [`ApiClient::renewed`] to pick up the new bearer token.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{Ack, LoginResponse, NewUser, StaffAccount, User};
use crate::session::{SessionError, SessionEvent};

const BAD_CREDENTIALS_MESSAGE: &str = "Identifiants incorrects";

/// Username + password pair sent to `POST /auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// The backend refused the credentials.
    #[error("login rejected: {0}")]
    Rejected(String),

    /// Transport or server failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Login succeeded but the session could not be persisted.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl LoginError {
    /// Text for the login form's error slot.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Rejected(message) => message,
            Self::Api(err) => err.user_message(),
            Self::Session(_) => "Impossible d'enregistrer la session",
        }
    }
}

#[derive(Deserialize)]
struct MeResponse {
    user: User,
}

#[derive(Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<StaffAccount>,
}

/// Sign in and persist the session.
///
/// # Errors
///
/// [`LoginError::Rejected`] for bad credentials or an incomplete success
/// body, [`LoginError::Api`] for transport failures, and
/// [`LoginError::Session`] when storage refuses the write.
pub async fn login(client: &ApiClient, credentials: &Credentials) -> Result<User, LoginError> {
    let response: LoginResponse = match client.post_json_public("/auth/login", credentials).await {
        Ok(response) => response,
        Err(ApiError::Application { status: 400 | 401, message }) => {
            tracing::info!(username = %credentials.username, "login rejected");
            return Err(LoginError::Rejected(message.unwrap_or_else(|| BAD_CREDENTIALS_MESSAGE.to_owned())));
        }
        Err(err) => return Err(err.into()),
    };

    let (true, Some(token), Some(user)) = (response.success, response.token, response.user) else {
        return Err(LoginError::Rejected(BAD_CREDENTIALS_MESSAGE.to_owned()));
    };
    if token.is_empty() {
        return Err(LoginError::Rejected(BAD_CREDENTIALS_MESSAGE.to_owned()));
    }

    client.session().save(&token, &user)?;
    tracing::info!(
        username = %user.username,
        role = user.role.as_str(),
        expires_in = ?response.expires_in,
        "signed in"
    );
    client.events().emit(SessionEvent::SignedIn { username: user.username.clone() });
    Ok(user)
}

/// Sign out. The server call is best effort; the local session is always
/// cleared.
pub async fn logout(client: &ApiClient) {
    if client.has_token() {
        if let Err(err) = client.post_json_public::<Ack, _>("/auth/logout", &serde_json::json!({})).await {
            tracing::debug!(error = %err, "server logout failed; clearing locally");
        }
    }
    client.session().clear();
    tracing::info!("signed out");
    client.events().emit(SessionEvent::SignedOut);
}

/// `GET /auth/me`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn current_user(client: &ApiClient) -> Result<User, ApiError> {
    let body: MeResponse = client.get_json("/auth/me").await?;
    Ok(body.user)
}

/// `GET /auth/users` (admin only).
///
/// # Errors
///
/// Any [`ApiError`]; non-admins get a 403 application error.
pub async fn users(client: &ApiClient) -> Result<Vec<StaffAccount>, ApiError> {
    let body: UsersResponse = client.get_json("/auth/users").await?;
    Ok(body.users)
}

/// `POST /auth/register` (admin only).
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn register(client: &ApiClient, user: &NewUser) -> Result<Ack, ApiError> {
    client.post_json("/auth/register", user).await
}
