use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;

use crate::reminders::{DispatchReport, ReminderError, ReminderPipeline};
use crate::utils::{error_chain_fmt, json_error};

/// Successful trigger response
#[derive(serde::Serialize)]
struct TriggerResponse {
    message: String,
    report: DispatchReport,
}

/// Reminder trigger error type
#[derive(thiserror::Error)]
pub enum TriggerError {
    #[error("A reminder cycle is already running")]
    Busy,
    #[error("Failed to process reminders")]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<ReminderError> for TriggerError {
    fn from(e: ReminderError) -> Self {
        match e {
            ReminderError::AlreadyRunning => Self::Busy,
            ReminderError::UnexpectedError(e) => Self::UnexpectedError(e),
        }
    }
}

impl ResponseError for TriggerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Busy => StatusCode::SERVICE_UNAVAILABLE,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), &self.to_string())
    }
}

/// Run a reminder cycle on demand and report how it went
#[tracing::instrument(name = "Trigger reminders", skip(pipeline))]
pub async fn run_reminders(
    pipeline: web::Data<ReminderPipeline>,
) -> Result<HttpResponse, TriggerError> {
    let report = pipeline.run_cycle(Utc::now()).await?;

    Ok(HttpResponse::Ok().json(TriggerResponse {
        message: format!(
            "Reminders processed: {} sent, {} failed, {} skipped",
            report.sent, report.failed, report.skipped
        ),
        report,
    }))
}
