//! E-mail alerts. The backend renders and sends the mail (or simulates the
//! send when SMTP is not configured); the client only triggers it.

#[cfg(test)]
#[path = "alerts_test.rs"]
mod alerts_test;

use serde::Serialize;

use super::client::ApiClient;
use super::error::ApiError;
use super::types::AlertReceipt;

#[derive(Serialize)]
struct StudentAlert<'a> {
    code: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct ModuleAlert<'a> {
    module: &'a str,
    emails: &'a [String],
}

#[derive(Serialize)]
struct WeeklyReport<'a> {
    email: &'a str,
}

/// Send one student's situation to `email`.
///
/// # Errors
///
/// Any [`ApiError`]; missing SMTP configuration is a 500 application error.
pub async fn student(client: &ApiClient, code: &str, email: &str) -> Result<AlertReceipt, ApiError> {
    let receipt: AlertReceipt = client.post_json("/alertes/test-email", &StudentAlert { code, email }).await?;
    tracing::info!(student = code, sent = receipt.email_sent, "student alert sent");
    Ok(receipt)
}

/// Notify `emails` that `module` is critical.
///
/// # Errors
///
/// Any [`ApiError`]; an unknown module is a 404 application error.
pub async fn module(client: &ApiClient, module: &str, emails: &[String]) -> Result<AlertReceipt, ApiError> {
    let receipt: AlertReceipt = client.post_json("/alertes/module", &ModuleAlert { module, emails }).await?;
    tracing::info!(module, recipients = emails.len(), sent = receipt.email_sent, "module alert sent");
    Ok(receipt)
}

/// Send the weekly summary report to `email`.
///
/// # Errors
///
/// Any [`ApiError`].
pub async fn weekly_report(client: &ApiClient, email: &str) -> Result<AlertReceipt, ApiError> {
    client.post_json("/alertes/rapport-hebdo", &WeeklyReport { email }).await
}
