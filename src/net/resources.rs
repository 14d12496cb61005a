//! Read-only dashboard resources: stats, students, modules, predictions.

#[cfg(test)]
#[path = "resources_test.rs"]
mod resources_test;

use serde::Serialize;

use super::client::{ApiClient, Endpoint};
use super::error::ApiError;
use super::types::{
    AtRiskBody, FutureModules, FutureModulesRequest, Health, ModuleDetail, ModuleList, Prediction, PredictionRequest,
    Stats, Student, StudentDetail, StudentPage, TrackList,
};

pub const DEFAULT_PER_PAGE: u32 = 20;

/// Filters for `GET /etudiants`. Empty strings are not sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub search: String,
    #[serde(rename = "filiere", skip_serializing_if = "String::is_empty")]
    pub track: String,
    #[serde(rename = "profil", skip_serializing_if = "String::is_empty")]
    pub profile: String,
}

impl Default for StudentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            search: String::new(),
            track: String::new(),
            profile: String::new(),
        }
    }
}

impl StudentQuery {
    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into().trim().to_owned();
        self
    }

    #[must_use]
    pub fn track(mut self, track: impl Into<String>) -> Self {
        self.track = track.into();
        self
    }

    #[must_use]
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }
}

/// `GET /health`. Does not need a session.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn health(client: &ApiClient) -> Result<Health, ApiError> {
    client.get_json("/health").await
}

/// `GET /stats`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn stats(client: &ApiClient) -> Result<Stats, ApiError> {
    client.get_json("/stats").await
}

/// `GET /etudiants`, one page.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn students(client: &ApiClient, query: &StudentQuery) -> Result<StudentPage, ApiError> {
    client.get_json_with_query("/etudiants", query).await
}

/// `GET /etudiant/{code}`.
///
/// # Errors
///
/// Any [`ApiError`]; an unknown code is a 404 application error.
pub async fn student(client: &ApiClient, code: &str) -> Result<StudentDetail, ApiError> {
    client.get_json(Endpoint::new("/etudiant").push(code)).await
}

/// `GET /etudiants-risque`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn students_at_risk(client: &ApiClient) -> Result<Vec<Student>, ApiError> {
    let body: AtRiskBody = client.get_json("/etudiants-risque").await?;
    Ok(body.into_students())
}

/// `GET /filieres`, sorted by the backend.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn tracks(client: &ApiClient) -> Result<Vec<String>, ApiError> {
    let body: TrackList = client.get_json("/filieres").await?;
    Ok(body.tracks)
}

/// `GET /modules`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn modules(client: &ApiClient) -> Result<ModuleList, ApiError> {
    client.get_json("/modules").await
}

/// `GET /module/{name}`. Module names may contain spaces and slashes; they
/// are sent as a single encoded segment.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn module(client: &ApiClient, name: &str) -> Result<ModuleDetail, ApiError> {
    client.get_json(Endpoint::new("/module").push(name)).await
}

/// `POST /predict`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn predict(client: &ApiClient, request: &PredictionRequest) -> Result<Prediction, ApiError> {
    client.post_json("/predict", request).await
}

/// `POST /predict/modules-futurs`: success outlook for every module the
/// student has not taken yet. Track and year are inferred by the backend.
///
/// # Errors
///
/// Any [`ApiError`]; an empty code is a 400 and an unknown one a 404.
pub async fn future_modules(client: &ApiClient, student_code: &str) -> Result<FutureModules, ApiError> {
    let request = FutureModulesRequest { student_code: student_code.trim().to_owned() };
    client.post_json("/predict/modules-futurs", &request).await
}
