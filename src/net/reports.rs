//! Generated documents: PDF reports and Excel exports.

#[cfg(test)]
#[path = "reports_test.rs"]
mod reports_test;

use super::client::{ApiClient, Endpoint};
use super::download::{Download, FileKind};
use super::error::ApiError;

/// PDF report rendered by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Report {
    /// Institution-wide summary.
    Global,
    /// One track (`filière`).
    Track(String),
    /// One student, by code.
    Student(String),
}

impl Report {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Global => Endpoint::new("/rapports/global"),
            Self::Track(track) => Endpoint::new("/rapports/filiere").push(track.as_str()),
            Self::Student(code) => Endpoint::new("/rapports/etudiant").push(code.as_str()),
        }
    }

    /// Filename stem used when the server does not name the file.
    #[must_use]
    pub fn stem(&self) -> String {
        match self {
            Self::Global => "rapport_global_administration".to_owned(),
            Self::Track(track) => format!("rapport_filiere_{track}"),
            Self::Student(code) => format!("rapport_etudiant_{code}"),
        }
    }
}

/// Excel export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Export {
    Students,
    AtRiskStudents,
    Modules,
    Interventions,
    /// Multi-sheet workbook; admin only.
    FullReport,
}

impl Export {
    pub const ALL: [Self; 5] = [Self::Students, Self::AtRiskStudents, Self::Modules, Self::Interventions, Self::FullReport];

    /// Stable identifier, also the filename stem and the URL tail.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Students => "etudiants",
            Self::AtRiskStudents => "etudiants-risque",
            Self::Modules => "modules",
            Self::Interventions => "interventions",
            Self::FullReport => "rapport-complet",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|export| export.id() == id)
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Students => "Liste des Étudiants",
            Self::AtRiskStudents => "Étudiants à Risque",
            Self::Modules => "Statistiques Modules",
            Self::Interventions => "Historique Interventions",
            Self::FullReport => "Rapport Complet",
        }
    }

    #[must_use]
    pub fn admin_only(self) -> bool {
        self == Self::FullReport
    }

    #[must_use]
    pub fn endpoint(self) -> Endpoint {
        Endpoint::new("/export").push(self.id())
    }
}

/// Download a PDF report.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn report(client: &ApiClient, report: &Report) -> Result<Download, ApiError> {
    let download = client.download(report.endpoint(), &report.stem(), FileKind::Pdf).await?;
    tracing::info!(file = %download.filename, bytes = download.bytes.len(), "report downloaded");
    Ok(download)
}

/// Download an Excel export.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn export(client: &ApiClient, export: Export) -> Result<Download, ApiError> {
    let download = client.download(export.endpoint(), export.id(), FileKind::Excel).await?;
    tracing::info!(file = %download.filename, bytes = download.bytes.len(), "export downloaded");
    Ok(download)
}
