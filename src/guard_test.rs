use std::sync::Mutex;

use super::*;
use crate::net::types::Role;
use crate::session::{KeyValueSessionStore, MemoryBackend, SessionError, SessionEvents, USER_KEY, memory_store};

#[derive(Default)]
struct RecordingNavigator {
    visits: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    fn visits(&self) -> Vec<Route> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, to: &Route) {
        self.visits.lock().unwrap().push(to.clone());
    }
}

/// Store wrapper that records every read so tests can check ordering.
struct TracingStore {
    inner: Arc<KeyValueSessionStore<MemoryBackend>>,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl SessionStore for TracingStore {
    fn token(&self) -> Option<String> {
        self.log.lock().unwrap().push("token");
        self.inner.token()
    }

    fn user(&self) -> Option<User> {
        self.log.lock().unwrap().push("user");
        self.inner.user()
    }

    fn save(&self, token: &str, user: &User) -> Result<(), SessionError> {
        self.inner.save(token, user)
    }

    fn clear(&self) {
        self.log.lock().unwrap().push("clear");
        self.inner.clear();
    }
}

fn admin() -> User {
    User {
        username: "admin".to_owned(),
        role: Role::Admin,
        last_name: "Admin".to_owned(),
        first_name: "Super".to_owned(),
        email: "admin@universite.ma".to_owned(),
        permissions: vec![],
    }
}

fn guard_over(store: Arc<dyn SessionStore>) -> (RouteGuard, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let guard = RouteGuard::new(store, navigator.clone());
    (guard, navigator)
}

fn protected_routes() -> Vec<Route> {
    vec![
        Route::Dashboard,
        Route::Students,
        Route::Student("E1".to_owned()),
        Route::Modules,
        Route::AtRisk,
        Route::Predictions,
        Route::FutureModules,
        Route::Interventions,
        Route::Alerts,
        Route::Reports,
        Route::Exports,
        Route::Assistant,
    ]
}

// =============================================================================
// ROUTES
// =============================================================================

#[test]
fn paths_parse_back_to_routes() {
    let mut routes = protected_routes();
    routes.push(Route::Login);
    for route in routes {
        assert_eq!(Route::from_path(&route.path()), Some(route));
    }
}

#[test]
fn unknown_or_nested_paths_do_not_parse() {
    assert_eq!(Route::from_path("/nope"), None);
    assert_eq!(Route::from_path("/etudiants/"), Some(Route::Students));
    assert_eq!(Route::from_path("/etudiants/E1/notes"), None);
}

#[test]
fn only_login_is_public() {
    assert!(Route::Login.is_public());
    assert!(protected_routes().iter().all(|r| !r.is_public()));
}

// =============================================================================
// GUARD
// =============================================================================

#[test]
fn no_session_always_redirects() {
    let (guard, navigator) = guard_over(memory_store());
    for route in protected_routes() {
        let mut rendered = false;
        assert_eq!(guard.enter(&route, |_| rendered = true), None);
        assert!(!rendered);
        assert_eq!(guard.check(&route).state(), GuardState::Redirecting);
    }
    assert!(navigator.visits().iter().all(|r| *r == Route::Login));
    assert_eq!(navigator.visits().len(), protected_routes().len() * 2);
}

#[test]
fn live_session_renders_once_after_reading_store() {
    let inner = memory_store();
    inner.save("abc", &admin()).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(TracingStore { inner, log: log.clone() });
    let (guard, navigator) = guard_over(store);

    let mut renders = 0;
    let seen = guard.enter(&Route::Students, |user| {
        renders += 1;
        assert_eq!(*log.lock().unwrap(), vec!["token", "user"]);
        user.map(|u| u.username.clone())
    });

    assert_eq!(renders, 1);
    assert_eq!(seen, Some(Some("admin".to_owned())));
    assert!(navigator.visits().is_empty());
}

#[test]
fn login_route_skips_profile_load() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(TracingStore { inner: memory_store(), log: log.clone() });
    let (guard, navigator) = guard_over(store);

    let outcome = guard.check(&Route::Login);
    assert_eq!(outcome, GuardOutcome::Allowed { user: None, already_signed_in: false });
    assert!(!log.lock().unwrap().contains(&"user"));
    assert!(navigator.visits().is_empty());
}

#[test]
fn login_route_with_session_hints_already_signed_in() {
    let store = memory_store();
    store.save("abc", &admin()).unwrap();
    let (guard, _navigator) = guard_over(store);

    assert!(matches!(guard.check(&Route::Login), GuardOutcome::Allowed { already_signed_in: true, .. }));
}

#[test]
fn token_with_corrupt_profile_is_cleared_and_redirected() {
    let store = memory_store();
    store.save("abc", &admin()).unwrap();
    store.backend().insert_raw(USER_KEY, "{invalid");
    let (guard, navigator) = guard_over(store.clone());

    assert_eq!(guard.check(&Route::Dashboard), GuardOutcome::Redirected);
    assert!(!store.is_authenticated());
    assert_eq!(navigator.visits(), vec![Route::Login]);
}

#[test]
fn each_navigation_rereads_the_store() {
    let store = memory_store();
    let (guard, _navigator) = guard_over(store.clone());

    assert_eq!(guard.check(&Route::Modules), GuardOutcome::Redirected);
    store.save("abc", &admin()).unwrap();
    assert_eq!(guard.check(&Route::Modules).user(), Some(&admin()));
    store.clear();
    assert_eq!(guard.check(&Route::Modules), GuardOutcome::Redirected);
}

// =============================================================================
// INVALIDATION LISTENER
// =============================================================================

#[test]
fn only_invalidation_redirects() {
    let navigator = RecordingNavigator::default();
    assert!(!redirect_on_invalidation(&SessionEvent::SignedOut, &navigator));
    assert!(!redirect_on_invalidation(&SessionEvent::SignedIn { username: "a".to_owned() }, &navigator));
    assert!(redirect_on_invalidation(&SessionEvent::Invalidated { path: "/stats".to_owned() }, &navigator));
    assert_eq!(navigator.visits(), vec![Route::Login]);
}

#[tokio::test]
async fn listener_follows_events_until_hub_drops() {
    let events = SessionEvents::new();
    let navigator = Arc::new(RecordingNavigator::default());
    let listener = tokio::spawn(follow_invalidations(events.subscribe(), navigator.clone()));

    events.emit(SessionEvent::SignedIn { username: "admin".to_owned() });
    events.emit(SessionEvent::Invalidated { path: "/etudiants".to_owned() });
    drop(events);
    listener.await.unwrap();

    assert_eq!(navigator.visits(), vec![Route::Login]);
}
