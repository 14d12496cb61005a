use std::collections::HashMap;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing;
use serde_json::{Value, json};

use super::*;
use crate::net::client::test_helpers::{client, spawn_backend};

fn record(id: i64, statut: &str) -> Value {
    json!({
        "id": id, "etudiant_id": "E1", "etudiant_nom": "Amine", "type": "tutorat", "titre": "Soutien algo",
        "description": "", "statut": statut, "priorite": "haute", "date": "2025-03-14",
        "created_by": "admin", "notes": [], "resultat": ""
    })
}

async fn list_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    // total echoes how many query parameters arrived
    Json(json!({ "interventions": [record(1, "planifié")], "total": params.len() }))
}

async fn one_handler(Path(id): Path<i64>) -> impl IntoResponse {
    if id == 1 {
        (StatusCode::OK, Json(json!({ "intervention": record(1, "planifié") })))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "Intervention non trouvée" })))
    }
}

async fn update_handler(Path(id): Path<i64>, Json(body): Json<Value>) -> Json<Value> {
    let statut = body["statut"].as_str().unwrap_or("planifié").to_owned();
    Json(json!({ "success": true, "intervention": record(id, &statut), "message": "Intervention mise à jour" }))
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/interventions",
            routing::get(list_handler).post(|Json(body): Json<Value>| async move {
                let mut created = record(7, "planifié");
                created["titre"] = body["titre"].clone();
                Json(json!({ "success": true, "intervention": created, "message": "Intervention créée avec succès" }))
            }),
        )
        .route(
            "/api/interventions/{id}",
            routing::get(one_handler).put(update_handler).delete(|| async {
                Json(json!({ "success": true, "message": "Intervention supprimée" }))
            }),
        )
        .route(
            "/api/interventions/stats",
            routing::get(|| async {
                Json(json!({
                    "total": 3, "par_statut": { "planifié": 2, "terminé": 1 }, "par_type": { "tutorat": 3 },
                    "par_priorite": { "haute": 3 }, "recentes_7j": 1, "etudiants_suivis": 2
                }))
            }),
        )
        .route(
            "/api/interventions/etudiant/{id}",
            routing::get(|Path(id): Path<String>| async move {
                Json(json!({ "etudiant_id": id, "interventions": [record(1, "en_cours"), record(2, "terminé")], "total": 2 }))
            }),
        )
}

#[test]
fn normalized_filter_drops_blank_values() {
    let filter = InterventionFilter {
        student_id: Some("  ".to_owned()),
        kind: Some(" tutorat ".to_owned()),
        status: Some(String::new()),
        limit: Some(50),
    }
    .normalized();
    assert_eq!(filter.student_id, None);
    assert_eq!(filter.kind.as_deref(), Some("tutorat"));
    assert_eq!(filter.status, None);
    assert_eq!(serde_json::to_value(&filter).unwrap(), json!({ "type": "tutorat", "limit": 50 }));
}

#[test]
fn value_sets_contain_defaults() {
    assert!(KINDS.contains(&"autre"));
    assert!(PRIORITIES.contains(&"normale"));
    assert!(STATUSES.contains(&"planifié"));
}

#[tokio::test]
async fn list_sends_only_non_empty_filters() {
    let base = spawn_backend(router()).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    let filter = InterventionFilter { status: Some("planifié".to_owned()), kind: Some(String::new()), ..Default::default() };
    let list = list(&client, filter).await.unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.interventions[0].date.as_deref(), Some("2025-03-14"));
    assert_eq!(list.interventions[0].kind, "tutorat");
}

#[tokio::test]
async fn get_unwraps_envelope_and_maps_not_found() {
    let base = spawn_backend(router()).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    assert_eq!(get(&client, 1).await.unwrap().title, "Soutien algo");
    let err = get(&client, 99).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), "Intervention non trouvée");
}

#[tokio::test]
async fn create_update_delete_round_trip_through_backend() {
    let base = spawn_backend(router()).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    let created = create(
        &client,
        &NewIntervention {
            student_id: "E1".to_owned(),
            student_name: None,
            kind: "appel".to_owned(),
            title: "Appel parents".to_owned(),
            description: None,
            priority: "normale".to_owned(),
        },
    )
    .await
    .unwrap();
    assert_eq!(created.id, 7);
    assert_eq!(created.title, "Appel parents");

    let changes = InterventionUpdate { status: Some("terminé".to_owned()), ..Default::default() };
    let updated = update(&client, 7, &changes).await.unwrap();
    assert_eq!(updated.status, "terminé");

    assert!(delete(&client, 7).await.unwrap().success);
}

#[tokio::test]
async fn student_history_and_stats_decode() {
    let base = spawn_backend(router()).await;
    let (client, _store, _events) = client(&base, Some("abc"));

    let history = for_student(&client, "E1").await.unwrap();
    assert_eq!(history.total, 2);

    let stats = stats(&client).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_status.get("planifié"), Some(&2));
    assert_eq!(stats.students_followed, 2);
    assert_eq!(stats.last_7_days, 1);
}
