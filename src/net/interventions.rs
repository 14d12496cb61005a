//! Intervention log: the pedagogical actions staff record against students.

#[cfg(test)]
#[path = "interventions_test.rs"]
mod interventions_test;

use serde::{Deserialize, Serialize};

use super::client::{ApiClient, Endpoint};
use super::error::{ApiError, GENERIC_ERROR_MESSAGE};
use super::types::{Ack, Intervention, InterventionList, InterventionStats, InterventionUpdate, NewIntervention};

pub const KINDS: [&str; 5] = ["tutorat", "email", "appel", "reunion", "autre"];
pub const STATUSES: [&str; 4] = ["planifié", "en_cours", "terminé", "annulé"];
pub const PRIORITIES: [&str; 4] = ["basse", "normale", "haute", "urgente"];

/// Filters for `GET /interventions`. Only non-empty values are sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InterventionFilter {
    #[serde(rename = "etudiant_id", skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "statut", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl InterventionFilter {
    /// Drop blank string filters so they never reach the query string.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
        }
        Self {
            student_id: keep(self.student_id),
            kind: keep(self.kind),
            status: keep(self.status),
            limit: self.limit,
        }
    }
}

#[derive(Deserialize)]
struct InterventionBody {
    intervention: Option<Intervention>,
    #[serde(default)]
    message: Option<String>,
}

impl InterventionBody {
    fn into_intervention(self) -> Result<Intervention, ApiError> {
        self.intervention.ok_or_else(|| {
            ApiError::Decode(self.message.unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_owned()))
        })
    }
}

/// `GET /interventions`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn list(client: &ApiClient, filter: InterventionFilter) -> Result<InterventionList, ApiError> {
    client.get_json_with_query("/interventions", &filter.normalized()).await
}

/// `GET /interventions/{id}`.
///
/// # Errors
///
/// Any [`ApiError`]; an unknown id is a 404 application error.
pub async fn get(client: &ApiClient, id: i64) -> Result<Intervention, ApiError> {
    let body: InterventionBody = client.get_json(Endpoint::new("/interventions").push(id.to_string())).await?;
    body.into_intervention()
}

/// `GET /interventions/etudiant/{id}`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn for_student(client: &ApiClient, student_id: &str) -> Result<InterventionList, ApiError> {
    client.get_json(Endpoint::new("/interventions/etudiant").push(student_id)).await
}

/// `POST /interventions`, returning the stored record.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn create(client: &ApiClient, intervention: &NewIntervention) -> Result<Intervention, ApiError> {
    let body: InterventionBody = client.post_json("/interventions", intervention).await?;
    tracing::info!(student = %intervention.student_id, kind = %intervention.kind, "intervention created");
    body.into_intervention()
}

/// `PUT /interventions/{id}`, returning the updated record.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn update(client: &ApiClient, id: i64, changes: &InterventionUpdate) -> Result<Intervention, ApiError> {
    let body: InterventionBody = client.put_json(Endpoint::new("/interventions").push(id.to_string()), changes).await?;
    body.into_intervention()
}

/// `DELETE /interventions/{id}` (admin only).
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn delete(client: &ApiClient, id: i64) -> Result<Ack, ApiError> {
    let ack = client.delete_json(Endpoint::new("/interventions").push(id.to_string())).await?;
    tracing::info!(id, "intervention deleted");
    Ok(ack)
}

/// `GET /interventions/stats`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn stats(client: &ApiClient) -> Result<InterventionStats, ApiError> {
    client.get_json("/interventions/stats").await
}
