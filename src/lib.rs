//! # supportdesk
//!
//! Client library for the student-support dashboard backend.
//!
//! The backend owns every analytic (risk scores, profiles, reports). This
//! crate only keeps the signed-in session, talks to the REST API with the
//! session's bearer token, and decides which views a visitor may enter.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` persists the token + profile pair, `net` wraps the REST calls and
//! tears the session down on 401, and `guard` gates route entry on session
//! state. `forms` holds the presence checks run before anything is submitted.

pub mod config;
pub mod forms;
pub mod guard;
pub mod net;
pub mod session;

pub use config::ClientConfig;
pub use guard::{GuardOutcome, GuardState, Navigator, Route, RouteGuard};
pub use net::client::ApiClient;
pub use net::error::ApiError;
pub use net::types::{Role, User};
pub use session::{SessionEvent, SessionEvents, SessionStore};
