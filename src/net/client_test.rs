use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::TryRecvError;

use super::test_helpers::{client, client_with_timeout, spawn_backend, staff};
use super::*;

async fn echo_auth(headers: HeaderMap) -> Json<Value> {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(ToOwned::to_owned);
    Json(json!({ "authorization": auth }))
}

async fn reject() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token invalide ou expiré" })))
}

fn echo_router() -> Router {
    Router::new().route("/api/echo", get(echo_auth)).route("/api/private", get(reject))
}

// =============================================================================
// ENDPOINT
// =============================================================================

#[test]
fn endpoint_path_ignores_extra_slashes() {
    assert_eq!(Endpoint::new("//stats/").path(), "/stats");
    assert_eq!(Endpoint::new("/interventions").push("12").path(), "/interventions/12");
}

#[test]
fn endpoint_url_joins_onto_base_path() {
    let url = Endpoint::new("/etudiants-risque").url("http://localhost:5000/api").unwrap();
    assert_eq!(url.as_str(), "http://localhost:5000/api/etudiants-risque");
}

#[test]
fn endpoint_url_encodes_segments() {
    let url = Endpoint::new("/module").push("Analyse Num/II").url("http://h/api").unwrap();
    assert_eq!(url.as_str(), "http://h/api/module/Analyse%20Num%2FII");
}

// =============================================================================
// AUTHORIZATION HEADER
// =============================================================================

#[tokio::test]
async fn stored_token_is_sent_as_bearer() {
    let base = spawn_backend(echo_router()).await;
    let (client, _store, _events) = client(&base, Some("abc"));
    assert!(client.has_token());

    let body: Value = client.get_json("/echo").await.unwrap();
    assert_eq!(body["authorization"], "Bearer abc");
}

#[tokio::test]
async fn no_token_means_no_header() {
    let base = spawn_backend(echo_router()).await;
    let (client, _store, _events) = client(&base, None);
    assert!(!client.has_token());

    let body: Value = client.get_json("/echo").await.unwrap();
    assert!(body["authorization"].is_null());
}

#[tokio::test]
async fn renewed_client_picks_up_new_token() {
    let base = spawn_backend(echo_router()).await;
    let (client, store, _events) = client(&base, None);
    store.save("fresh", &staff("prof", crate::Role::Instructor)).unwrap();

    let body: Value = client.renewed().unwrap().get_json("/echo").await.unwrap();
    assert_eq!(body["authorization"], "Bearer fresh");
}

// =============================================================================
// 401 TEARDOWN
// =============================================================================

#[tokio::test]
async fn unauthorized_clears_session_and_notifies() {
    let base = spawn_backend(echo_router()).await;
    let (client, store, events) = client(&base, Some("stale"));
    let mut rx = events.subscribe();

    let err = client.get_json::<Value>("/private").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(store.token().is_none());
    assert!(store.user().is_none());
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::Invalidated { path: "/private".to_owned() });
}

#[tokio::test]
async fn unauthorized_without_token_still_tears_down() {
    let base = spawn_backend(echo_router()).await;
    let (client, _store, events) = client(&base, None);
    let mut rx = events.subscribe();

    assert!(matches!(client.get_json::<Value>("/private").await, Err(ApiError::Unauthorized)));
    assert!(matches!(rx.try_recv(), Ok(SessionEvent::Invalidated { .. })));
}

#[tokio::test]
async fn concurrent_unauthorized_tears_down_once() {
    let base = spawn_backend(echo_router()).await;
    let (client, store, events) = client(&base, Some("stale"));
    let mut rx = events.subscribe();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..5 {
        let client = client.clone();
        tasks.spawn(async move { client.get_json::<Value>("/private").await });
    }
    while let Some(result) = tasks.join_next().await {
        assert!(matches!(result.unwrap(), Err(ApiError::Unauthorized)));
    }

    assert!(store.token().is_none());
    assert!(matches!(rx.try_recv(), Ok(SessionEvent::Invalidated { .. })));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn stale_client_leaves_newer_session_alone() {
    let base = spawn_backend(echo_router()).await;
    let (old, store, events) = client(&base, Some("stale"));
    let mut rx = events.subscribe();

    let instructor = staff("prof", crate::Role::Instructor);
    store.save("fresh", &instructor).unwrap();

    assert!(matches!(old.get_json::<Value>("/private").await, Err(ApiError::Unauthorized)));
    assert_eq!(store.token().as_deref(), Some("fresh"));
    assert_eq!(store.user(), Some(instructor));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    let renewed = old.renewed().unwrap();
    assert!(matches!(renewed.get_json::<Value>("/private").await, Err(ApiError::Unauthorized)));
    assert!(store.token().is_none());
    assert!(matches!(rx.try_recv(), Ok(SessionEvent::Invalidated { .. })));
}

// =============================================================================
// OTHER FAILURES
// =============================================================================

#[tokio::test]
async fn application_error_carries_backend_message() {
    let router = Router::new().route(
        "/api/etudiant/{code}",
        get(|Path(code): Path<String>| async move {
            (StatusCode::NOT_FOUND, Json(json!({ "error": format!("Étudiant {code} non trouvé") })))
        }),
    );
    let base = spawn_backend(router).await;
    let (client, store, _events) = client(&base, Some("abc"));

    let err = client.get_json::<Value>(Endpoint::new("/etudiant").push("E999")).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), "Étudiant E999 non trouvé");
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn server_error_without_body_uses_generic_message() {
    let router = Router::new().route("/api/stats", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let base = spawn_backend(router).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    let err = client.get_json::<Value>("/stats").await.unwrap_err();
    assert!(matches!(err, ApiError::Application { status: 500, message: None }));
    assert_eq!(err.user_message(), crate::net::error::GENERIC_ERROR_MESSAGE);
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let router = Router::new().route("/api/stats", get(|| async { "not json" }));
    let base = spawn_backend(router).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    assert!(matches!(client.get_json::<Value>("/stats").await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let router = Router::new().route(
        "/api/stats",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({}))
        }),
    );
    let base = spawn_backend(router).await;
    let (client, store, _events) = client_with_timeout(&base, Some("abc"), Duration::from_millis(100));

    let err = client.get_json::<Value>("/stats").await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout));
    assert_eq!(err.user_message(), crate::net::error::CONNECTION_ERROR_MESSAGE);
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (client, _store, _events) = client(&format!("http://{addr}/api"), Some("abc"));

    assert!(matches!(client.get_json::<Value>("/stats").await, Err(ApiError::Transport(_))));
}

// =============================================================================
// DOWNLOADS
// =============================================================================

#[tokio::test]
async fn download_uses_content_disposition_name() {
    let router = Router::new().route(
        "/api/rapports/global",
        get(|| async {
            (
                [
                    (header::CONTENT_TYPE, "application/pdf"),
                    (header::CONTENT_DISPOSITION, "attachment; filename=\"rapport_global.pdf\""),
                ],
                b"%PDF-1.4".to_vec(),
            )
        }),
    );
    let base = spawn_backend(router).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    let file = client.download("/rapports/global", "rapport_global_administration", FileKind::Pdf).await.unwrap();
    assert_eq!(file.filename, "rapport_global.pdf");
    assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(file.bytes, b"%PDF-1.4");
}

#[tokio::test]
async fn download_without_disposition_synthesizes_name() {
    let router = Router::new().route("/api/export/modules", get(|| async { vec![0x50_u8, 0x4b] }));
    let base = spawn_backend(router).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    let file = client.download("/export/modules", "modules", FileKind::Excel).await.unwrap();
    assert!(file.filename.starts_with("modules_"));
    assert!(file.filename.ends_with(".xlsx"));
}

#[tokio::test]
async fn download_error_json_becomes_application_error() {
    let router = Router::new().route(
        "/api/export/rapport-complet",
        get(|| async { (StatusCode::FORBIDDEN, Json(json!({ "error": "Accès refusé" }))) }),
    );
    let base = spawn_backend(router).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    let err = client.download("/export/rapport-complet", "rapport-complet", FileKind::Excel).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.user_message(), "Accès refusé");
}
