//! Presence checks run on form input before anything is sent.
//!
//! Each `validate_*` trims its input and returns the request payload, or a
//! message for the form's inline error slot. A failed check never reaches the
//! network.

#[cfg(test)]
#[path = "forms_test.rs"]
mod forms_test;

use crate::net::auth::Credentials;
use crate::net::types::NewIntervention;

pub const MISSING_CREDENTIALS: &str = "Identifiant et mot de passe requis";
pub const MISSING_FIELDS: &str = "Veuillez remplir tous les champs";
pub const MISSING_EMAIL: &str = "Veuillez entrer une adresse email";
pub const INVALID_EMAIL: &str = "Adresse email invalide";
pub const MISSING_INTERVENTION_FIELDS: &str = "Étudiant et titre requis";
pub const UNKNOWN_KIND: &str = "Type d'intervention inconnu";
pub const UNKNOWN_PRIORITY: &str = "Priorité inconnue";
pub const MISSING_MESSAGE: &str = "Message requis";
pub const MISSING_STUDENT_CODE: &str = "Code étudiant requis";

pub const DEFAULT_KIND: &str = "autre";
pub const DEFAULT_PRIORITY: &str = "normale";

/// Inline validation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FormError(pub &'static str);

/// Login form. The identifier is trimmed; the secret is sent as typed.
///
/// # Errors
///
/// [`MISSING_CREDENTIALS`] when either field is blank.
pub fn validate_login(username: &str, password: &str) -> Result<Credentials, FormError> {
    let username = username.trim();
    if username.is_empty() || password.trim().is_empty() {
        return Err(FormError(MISSING_CREDENTIALS));
    }
    Ok(Credentials { username: username.to_owned(), password: password.to_owned() })
}

/// Raw input of the new-intervention form.
#[derive(Clone, Debug, Default)]
pub struct InterventionForm {
    pub student_id: String,
    pub student_name: String,
    pub kind: String,
    pub title: String,
    pub description: String,
    pub priority: String,
}

impl InterventionForm {
    /// # Errors
    ///
    /// [`MISSING_INTERVENTION_FIELDS`] without a student or title; an
    /// unknown type or priority is rejected too.
    pub fn validate(&self) -> Result<NewIntervention, FormError> {
        let student_id = self.student_id.trim();
        let title = self.title.trim();
        if student_id.is_empty() || title.is_empty() {
            return Err(FormError(MISSING_INTERVENTION_FIELDS));
        }

        let kind = or_default(&self.kind, DEFAULT_KIND);
        if !crate::net::interventions::KINDS.contains(&kind) {
            return Err(FormError(UNKNOWN_KIND));
        }
        let priority = or_default(&self.priority, DEFAULT_PRIORITY);
        if !crate::net::interventions::PRIORITIES.contains(&priority) {
            return Err(FormError(UNKNOWN_PRIORITY));
        }

        Ok(NewIntervention {
            student_id: student_id.to_owned(),
            student_name: non_empty(&self.student_name),
            kind: kind.to_owned(),
            title: title.to_owned(),
            description: non_empty(&self.description),
            priority: priority.to_owned(),
        })
    }
}

/// Student alert: code and recipient.
///
/// # Errors
///
/// [`MISSING_FIELDS`] when either is blank, [`INVALID_EMAIL`] when the
/// address has no `@`.
pub fn validate_student_alert(code: &str, email: &str) -> Result<(String, String), FormError> {
    let (code, email) = (code.trim(), email.trim());
    if code.is_empty() || email.is_empty() {
        return Err(FormError(MISSING_FIELDS));
    }
    Ok((code.to_owned(), checked_email(email)?))
}

/// Module alert: module name and a comma-separated recipient list.
///
/// # Errors
///
/// [`MISSING_FIELDS`] without a module or recipient, [`INVALID_EMAIL`] when
/// any recipient has no `@`.
pub fn validate_module_alert(module: &str, recipients: &str) -> Result<(String, Vec<String>), FormError> {
    let module = module.trim();
    let emails: Vec<&str> = recipients.split(',').map(str::trim).filter(|e| !e.is_empty()).collect();
    if module.is_empty() || emails.is_empty() {
        return Err(FormError(MISSING_FIELDS));
    }
    let emails = emails.into_iter().map(checked_email).collect::<Result<Vec<_>, _>>()?;
    Ok((module.to_owned(), emails))
}

/// Weekly report recipient.
///
/// # Errors
///
/// [`MISSING_EMAIL`] when blank, [`INVALID_EMAIL`] without an `@`.
pub fn validate_report_recipient(email: &str) -> Result<String, FormError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError(MISSING_EMAIL));
    }
    checked_email(email)
}

/// Assistant question box.
///
/// # Errors
///
/// [`MISSING_MESSAGE`] when blank.
pub fn validate_chat_message(message: &str) -> Result<String, FormError> {
    non_empty(message).ok_or(FormError(MISSING_MESSAGE))
}

/// Student code for the upcoming-modules outlook.
///
/// # Errors
///
/// [`MISSING_STUDENT_CODE`] when blank.
pub fn validate_student_code(code: &str) -> Result<String, FormError> {
    non_empty(code).ok_or(FormError(MISSING_STUDENT_CODE))
}

fn checked_email(email: &str) -> Result<String, FormError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_owned()),
        _ => Err(FormError(INVALID_EMAIL)),
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() { default } else { value }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}
