//! Route guard: decides, per navigation, whether a view may render.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every front end (the CLI, a wasm shell) routes through one `RouteGuard`
//! so unauthenticated redirect behavior is identical everywhere. The guard
//! reads the injected session store and tells a [`Navigator`] where to go; it
//! never renders anything itself.
//!
//! DESIGN
//! ======
//! A navigation moves `Checking -> Allowed` or `Checking -> Redirecting` and
//! stops there. Nothing carries over between navigations: the store is
//! consulted afresh each time.
//!
//! INVARIANTS
//! ==========
//! A protected view renders at most once per navigation and only after the
//! store has been read. With no token the outcome is always a redirect to
//! [`Route::Login`]. A token whose profile cannot be read is a broken session:
//! the store is cleared and the navigation redirects.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::net::types::User;
use crate::session::{SessionEvent, SessionStore};

// =============================================================================
// ROUTES
// =============================================================================

/// Dashboard views.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Students,
    Student(String),
    Modules,
    AtRisk,
    Predictions,
    FutureModules,
    Interventions,
    Alerts,
    Reports,
    Exports,
    Assistant,
}

impl Route {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".to_owned(),
            Self::Dashboard => "/".to_owned(),
            Self::Students => "/etudiants".to_owned(),
            Self::Student(code) => format!("/etudiants/{code}"),
            Self::Modules => "/modules".to_owned(),
            Self::AtRisk => "/risque".to_owned(),
            Self::Predictions => "/prediction".to_owned(),
            Self::FutureModules => "/modules-futurs".to_owned(),
            Self::Interventions => "/interventions".to_owned(),
            Self::Alerts => "/alertes".to_owned(),
            Self::Reports => "/rapports".to_owned(),
            Self::Exports => "/exports".to_owned(),
            Self::Assistant => "/assistant".to_owned(),
        }
    }

    /// Parse a view path. Unknown paths yield `None`.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        let route = match trimmed {
            "" => Self::Dashboard,
            "/login" => Self::Login,
            "/etudiants" => Self::Students,
            "/modules" => Self::Modules,
            "/risque" => Self::AtRisk,
            "/prediction" => Self::Predictions,
            "/modules-futurs" => Self::FutureModules,
            "/interventions" => Self::Interventions,
            "/alertes" => Self::Alerts,
            "/rapports" => Self::Reports,
            "/exports" => Self::Exports,
            "/assistant" => Self::Assistant,
            other => {
                let code = other.strip_prefix("/etudiants/")?;
                if code.is_empty() || code.contains('/') {
                    return None;
                }
                Self::Student(code.to_owned())
            }
        };
        Some(route)
    }

    /// Reachable without a session.
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Side effect of a redirect. The guard decides; the navigator moves.
pub trait Navigator: Send + Sync {
    fn navigate(&self, to: &Route);
}

/// Where one navigation stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Allowed,
    Redirecting,
}

/// Result of one navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Render the view. `user` is always present for protected routes.
    /// `already_signed_in` is set when the login view is entered with a live
    /// session, so it can bounce straight to the dashboard.
    Allowed { user: Option<User>, already_signed_in: bool },
    /// Nothing renders; the navigator has been sent to the login route.
    Redirected,
}

impl GuardOutcome {
    #[must_use]
    pub fn state(&self) -> GuardState {
        match self {
            Self::Allowed { .. } => GuardState::Allowed,
            Self::Redirected => GuardState::Redirecting,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Allowed { user, .. } => user.as_ref(),
            Self::Redirected => None,
        }
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(session: Arc<dyn SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    /// Run the state machine for one navigation to `route`.
    pub fn check(&self, route: &Route) -> GuardOutcome {
        tracing::debug!(%route, state = ?GuardState::Checking, "navigation");

        if route.is_public() {
            return GuardOutcome::Allowed { user: None, already_signed_in: self.session.is_authenticated() };
        }

        if !self.session.is_authenticated() {
            return self.redirect(route);
        }

        match self.session.user() {
            Some(user) => {
                tracing::debug!(%route, username = %user.username, "navigation allowed");
                GuardOutcome::Allowed { user: Some(user), already_signed_in: true }
            }
            None => {
                tracing::warn!(%route, "token present but profile unreadable; clearing session");
                self.session.clear();
                self.redirect(route)
            }
        }
    }

    /// Check `route` and, when allowed, call `render` exactly once with the
    /// loaded profile. Returns `None` on redirect.
    pub fn enter<T, F>(&self, route: &Route, render: F) -> Option<T>
    where
        F: FnOnce(Option<&User>) -> T,
    {
        match self.check(route) {
            GuardOutcome::Allowed { user, .. } => Some(render(user.as_ref())),
            GuardOutcome::Redirected => None,
        }
    }

    fn redirect(&self, from: &Route) -> GuardOutcome {
        tracing::debug!(%from, "no session; redirecting to login");
        self.navigator.navigate(&Route::Login);
        GuardOutcome::Redirected
    }
}

// =============================================================================
// INVALIDATION LISTENER
// =============================================================================

/// Send the navigator to the login route when `event` is an invalidation.
/// Returns whether it did.
pub fn redirect_on_invalidation(event: &SessionEvent, navigator: &dyn Navigator) -> bool {
    if let SessionEvent::Invalidated { path } = event {
        tracing::info!(%path, "session invalidated; returning to login");
        navigator.navigate(&Route::Login);
        return true;
    }
    false
}

/// Drive [`redirect_on_invalidation`] until the event hub is dropped.
pub async fn follow_invalidations(mut events: broadcast::Receiver<SessionEvent>, navigator: Arc<dyn Navigator>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                redirect_on_invalidation(&event, navigator.as_ref());
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session event listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
