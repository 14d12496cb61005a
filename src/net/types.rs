//! Wire DTOs for the support backend's REST API.
//!
//! DESIGN
//! ======
//! The backend speaks French field names (`etudiant`, `filiere`, `moyenne`).
//! Rust-side names are English and mapped with `serde(rename)`, so the JSON
//! written back to the session store round-trips in the backend's own shape.
//! Fields the views only display are `#[serde(default)]` so a sparse payload
//! never fails a whole page.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// IDENTITY
// =============================================================================

/// Staff role asserted by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "enseignant", alias = "instructor")]
    Instructor,
    #[serde(rename = "tuteur", alias = "tutor")]
    Tutor,
}

impl Role {
    /// French display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrateur",
            Self::Instructor => "Enseignant",
            Self::Tutor => "Tuteur",
        }
    }

    /// Wire value as sent by the backend.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Instructor => "enseignant",
            Self::Tutor => "tuteur",
        }
    }
}

/// Signed-in staff profile, cached alongside the token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub role: Role,
    #[serde(rename = "nom", default, deserialize_with = "string_or_null")]
    pub last_name: String,
    #[serde(rename = "prenom", default, deserialize_with = "string_or_null")]
    pub first_name: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub email: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl User {
    /// `"First Last"`, falling back to the username when both are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() { self.username.clone() } else { full.to_owned() }
    }
}

/// Body returned by `POST /auth/login`.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    pub token: Option<String>,
    pub user: Option<User>,
    /// Token lifetime in seconds, when the backend reports one.
    pub expires_in: Option<u64>,
}

/// Staff account as listed by `GET /auth/users`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffAccount {
    pub id: i64,
    pub username: String,
    pub role: Role,
    #[serde(rename = "nom", default, deserialize_with = "string_or_null")]
    pub last_name: String,
    #[serde(rename = "prenom", default, deserialize_with = "string_or_null")]
    pub first_name: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub email: String,
    #[serde(default, deserialize_with = "bool_from_int_or_bool")]
    pub active: bool,
    pub created_at: Option<String>,
}

/// Payload for `POST /auth/register`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    pub email: String,
}

// =============================================================================
// STUDENTS
// =============================================================================

/// Profile classification computed server-side from a student's average.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub level: i64,
}

/// The backend sends a profile either as a bare name or as a full object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    Name(String),
    Info(ProfileInfo),
}

impl Profile {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Info(info) => &info.name,
        }
    }
}

/// One row of the student list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(deserialize_with = "string_from_any")]
    pub id: String,
    #[serde(rename = "filiere", default)]
    pub track: String,
    #[serde(rename = "annee")]
    pub year: Option<i64>,
    #[serde(rename = "moyenne", default)]
    pub average: f64,
    #[serde(default)]
    pub nb_modules: i64,
    #[serde(rename = "modules_echec")]
    pub failed_modules: Option<i64>,
    #[serde(rename = "taux_echec")]
    pub failure_rate: Option<f64>,
    #[serde(rename = "profil")]
    pub profile: Option<Profile>,
    #[serde(rename = "profil_info")]
    pub profile_info: Option<ProfileInfo>,
    #[serde(rename = "score_risque")]
    pub risk_score: Option<f64>,
    #[serde(rename = "probabilite_risque")]
    pub risk_probability: Option<f64>,
}

impl Student {
    /// Profile name, or `"Non défini"` when the backend sent none.
    #[must_use]
    pub fn profile_name(&self) -> &str {
        self.profile
            .as_ref()
            .map(Profile::name)
            .or_else(|| self.profile_info.as_ref().map(|info| info.name.as_str()))
            .unwrap_or("Non défini")
    }
}

/// Paginated `GET /etudiants` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudentPage {
    #[serde(rename = "etudiants", default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(alias = "limit")]
    pub per_page: Option<u32>,
    pub total_pages: Option<u32>,
}

/// One module result inside a student detail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudentModule {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "nom_original")]
    pub original_name: Option<String>,
    #[serde(rename = "note")]
    pub grade: f64,
    pub status: Option<String>,
    pub semester: Option<i64>,
    #[serde(default)]
    pub needs_support: bool,
}

/// `GET /etudiant/{code}` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudentDetail {
    #[serde(deserialize_with = "string_from_any")]
    pub id: String,
    #[serde(rename = "filiere", default)]
    pub track: String,
    #[serde(rename = "moyenne", default)]
    pub average: f64,
    #[serde(default)]
    pub nb_modules: i64,
    #[serde(rename = "modules_echec", default)]
    pub failed_modules: i64,
    #[serde(rename = "taux_echec", default)]
    pub failure_rate: f64,
    #[serde(rename = "score_risque")]
    pub risk_score: Option<f64>,
    #[serde(rename = "profil")]
    pub profile: Option<Profile>,
    #[serde(rename = "recommandation")]
    pub recommendation: Option<Value>,
    #[serde(default)]
    pub modules: Vec<StudentModule>,
    #[serde(rename = "modules_prioritaires", default)]
    pub priority_modules: Vec<StudentModule>,
}

/// `GET /etudiants-risque` returns either a bare list or `{etudiants: [...]}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AtRiskBody {
    List(Vec<Student>),
    Wrapped {
        #[serde(rename = "etudiants")]
        students: Vec<Student>,
    },
}

impl AtRiskBody {
    pub(crate) fn into_students(self) -> Vec<Student> {
        match self {
            Self::List(students) | Self::Wrapped { students } => students,
        }
    }
}

// =============================================================================
// MODULES, STATS, PREDICTIONS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    #[serde(rename = "niveau")]
    pub level: String,
    #[serde(default)]
    pub color: String,
}

/// Course module with aggregate statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "nom_fr", default)]
    pub name_fr: String,
    #[serde(rename = "nb_etudiants", default)]
    pub student_count: i64,
    #[serde(rename = "moyenne", default)]
    pub average: f64,
    #[serde(rename = "taux_echec", default)]
    pub failure_rate: f64,
    #[serde(rename = "difficulte")]
    pub difficulty: Option<Difficulty>,
}

/// Per-track breakdown inside a module detail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackBreakdown {
    #[serde(rename = "nom")]
    pub track: String,
    #[serde(rename = "moyenne", default)]
    pub average: f64,
    #[serde(rename = "taux_echec", default)]
    pub failure_rate: f64,
    #[serde(rename = "nb_etudiants", default)]
    pub student_count: i64,
}

/// `GET /module/{name}` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleDetail {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "nom_fr", default)]
    pub name_fr: String,
    #[serde(rename = "moyenne", default)]
    pub average: f64,
    #[serde(rename = "taux_echec", default)]
    pub failure_rate: f64,
    #[serde(rename = "nb_etudiants", default)]
    pub student_count: i64,
    #[serde(rename = "filieres", default)]
    pub tracks: Vec<TrackBreakdown>,
    /// Grade band (`"0-4"`, `"10-12"`, ...) to student count.
    #[serde(default)]
    pub distribution: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct TrackList {
    #[serde(rename = "filieres", default)]
    pub tracks: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleList {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub total: u64,
}

/// `GET /health`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data_loaded: bool,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub interventions_count: u64,
}

/// `GET /stats` dashboard summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(rename = "nb_etudiants", default)]
    pub students: u64,
    #[serde(rename = "nb_modules", default)]
    pub modules: u64,
    #[serde(rename = "nb_filieres", default)]
    pub tracks: u64,
    #[serde(rename = "taux_echec_global", default)]
    pub failure_rate: f64,
    #[serde(rename = "moyenne_generale", default)]
    pub average: f64,
    #[serde(rename = "profils_count", default)]
    pub profile_counts: BTreeMap<String, u64>,
    #[serde(rename = "filieres_stats", default)]
    pub track_stats: BTreeMap<String, Value>,
}

/// One module grade submitted for a prediction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GradeInput {
    pub code: String,
    pub note: f64,
}

/// Payload for `POST /predict`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionRequest {
    #[serde(rename = "code_etudiant", skip_serializing_if = "Option::is_none")]
    pub student_code: Option<String>,
    #[serde(rename = "filiere")]
    pub track: String,
    pub modules: Vec<GradeInput>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "etudiant_code")]
    pub student_code: String,
    #[serde(rename = "risque")]
    pub at_risk: bool,
    /// Risk probability as a percentage.
    #[serde(rename = "probabilite")]
    pub probability: f64,
    #[serde(rename = "profil", default)]
    pub profile: String,
    #[serde(rename = "recommandations", default)]
    pub recommendations: Vec<String>,
    #[serde(rename = "modules_similaires", default)]
    pub similar_modules: Vec<String>,
    #[serde(rename = "categorie_risque")]
    pub risk_category: Option<String>,
}

/// Payload for `POST /predict/modules-futurs`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FutureModulesRequest {
    #[serde(rename = "code_etudiant")]
    pub student_code: String,
}

/// Cohort figures for a module the student has not taken yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleFigures {
    #[serde(rename = "moyenne", default)]
    pub average: f64,
    #[serde(rename = "taux_echec", default)]
    pub failure_rate: f64,
    #[serde(rename = "nb_etudiants", default)]
    pub student_count: i64,
}

/// Success outlook for one upcoming module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FutureModule {
    pub module: String,
    #[serde(rename = "module_traduit", default)]
    pub name_fr: String,
    /// Percentages, 0 to 100.
    #[serde(rename = "probabilite_reussite")]
    pub success_probability: f64,
    #[serde(rename = "probabilite_echec", default)]
    pub failure_probability: f64,
    #[serde(rename = "besoin_soutien", default)]
    pub needs_support: bool,
    /// Risk band (`EXCELLENT` .. `TRÈS RISQUÉ`) with its display color.
    #[serde(rename = "categorie")]
    pub category: Option<Difficulty>,
    #[serde(rename = "action_preventive", default)]
    pub preventive_action: String,
    #[serde(rename = "statistiques_module")]
    pub figures: Option<ModuleFigures>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureModulesSummary {
    #[serde(rename = "modules_haut_risque", default)]
    pub high_risk: u64,
    #[serde(rename = "modules_risque_modere", default)]
    pub moderate_risk: u64,
    #[serde(rename = "modules_recommandes", default)]
    pub recommended: u64,
}

/// `POST /predict/modules-futurs` response. Predictions come riskiest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FutureModules {
    #[serde(rename = "etudiant")]
    pub student_code: String,
    #[serde(rename = "filiere", default)]
    pub track: String,
    #[serde(rename = "annee_actuelle", default)]
    pub current_year: i64,
    #[serde(rename = "annees_futures", default)]
    pub future_years: Vec<i64>,
    #[serde(rename = "moyenne_generale", default)]
    pub average: f64,
    #[serde(rename = "nb_modules_passes", default)]
    pub passed_count: u64,
    #[serde(default)]
    pub predictions: Vec<FutureModule>,
    #[serde(rename = "resume", default)]
    pub summary: FutureModulesSummary,
}

// =============================================================================
// INTERVENTIONS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterventionNote {
    #[serde(rename = "texte")]
    pub text: String,
    #[serde(rename = "auteur", default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
}

/// A logged tutoring action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub id: i64,
    #[serde(rename = "etudiant_id", deserialize_with = "string_from_any")]
    pub student_id: String,
    #[serde(rename = "etudiant_nom")]
    pub student_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "titre", default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "statut")]
    pub status: String,
    #[serde(rename = "priorite")]
    pub priority: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub notes: Vec<InterventionNote>,
    #[serde(rename = "resultat")]
    pub outcome: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterventionList {
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterventionStats {
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "par_statut", default)]
    pub by_status: BTreeMap<String, u64>,
    #[serde(rename = "par_type", default)]
    pub by_kind: BTreeMap<String, u64>,
    #[serde(rename = "par_priorite", default)]
    pub by_priority: BTreeMap<String, u64>,
    #[serde(rename = "recentes_7j", default)]
    pub last_7_days: u64,
    #[serde(rename = "etudiants_suivis", default)]
    pub students_followed: u64,
}

/// Payload for `POST /interventions`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewIntervention {
    #[serde(rename = "etudiant_id")]
    pub student_id: String,
    #[serde(rename = "etudiant_nom", skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "priorite")]
    pub priority: String,
}

/// Payload for `PUT /interventions/{id}`; unset fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InterventionUpdate {
    #[serde(rename = "statut", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "resultat", skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(rename = "nouvelle_note", skip_serializing_if = "Option::is_none")]
    pub new_note: Option<String>,
    #[serde(rename = "priorite", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// `{message}` body returned by the alert endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub email_sent: bool,
    /// `smtp` when mail really went out, `simulation` otherwise.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

// =============================================================================
// ASSISTANT
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of an assistant conversation, as replayed in `history`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// `GET /chat/welcome`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatWelcome {
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `POST /chat/message` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(rename = "response")]
    pub text: String,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    /// Provider cost in USD.
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `GET /chat/stats`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantStatus {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub total_modules: u64,
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

fn default_page() -> u32 {
    1
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Student ids arrive as strings from some endpoints and numbers from others.
fn string_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

fn bool_from_int_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().is_some_and(|v| v != 0)),
        Value::Null => Ok(false),
        other => Err(D::Error::custom(format!("expected bool, got {other}"))),
    }
}
