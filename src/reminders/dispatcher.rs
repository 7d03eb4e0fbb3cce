use std::time;

use chrono::NaiveDate;
use html_escape::encode_text;

use crate::domain::{format_ddmmyyyy, EmailAddress, UserId};
use crate::email_client::{MailError, MailTransport, OutgoingMessage};
use crate::reminders::aggregator::ReminderEvent;

/// Outcome of a dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchReport {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Members whose reminder went out, with the date it was about
    #[serde(skip)]
    pub delivered: Vec<(UserId, NaiveDate)>,
}

/// Knobs for composing and pacing reminder messages
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Pause between two consecutive sends
    pub pause: time::Duration,
    /// Closing line of every message
    pub signature: String,
}

/// Compose the reminder message for an event
fn compose(
    event: &ReminderEvent,
    sender: &EmailAddress,
    bcc: Vec<EmailAddress>,
    signature: &str,
) -> OutgoingMessage {
    let event_messages = event
        .events
        .iter()
        .map(|e| format!("{} on {}", e.kind, format_ddmmyyyy(e.occurrence_date)))
        .collect::<Vec<_>>()
        .join(" and ");
    let name = &event.full_name;

    // Names and signature are user-supplied text, never markup
    let html_name = encode_text(name);
    let html_events = encode_text(&event_messages);
    let html_signature = encode_text(signature);

    OutgoingMessage {
        from: sender.clone(),
        to: sender.clone(),
        bcc,
        subject: format!("Event Reminder: {name}"),
        html_body: format!(
            "<p>Hello,</p>\
            <p>This is a reminder that {html_name} has the following event(s) today:<br />\
            {html_events}.</p>\
            <p>Best regards,<br />{html_signature}</p>"
        ),
        text_body: format!(
            "Hello,\n\nThis is a reminder that {name} has the following event(s) today:\n\
            {event_messages}.\n\nBest regards,\n{signature}"
        ),
    }
}

/// Send one message per event to every other opted-in member, hiding recipients from each other
#[tracing::instrument(name = "Dispatch reminders", skip_all, fields(events = events.len()))]
pub async fn dispatch(
    transport: &dyn MailTransport,
    events: &[ReminderEvent],
    all_opted_in_emails: &[EmailAddress],
    options: &DispatchOptions,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    let mut attempted = false;

    for event in events {
        report.processed += 1;

        // Never notify a member about their own event
        let recipients: Vec<EmailAddress> = all_opted_in_emails
            .iter()
            .filter(|r| !r.is_same_mailbox(&event.email))
            .cloned()
            .collect();
        if recipients.is_empty() {
            tracing::info!(
                user_id = %event.user_id,
                "Skipping a reminder because nobody else is opted in"
            );
            report.skipped += 1;
            continue;
        }

        // Respect the outbound rate limit
        if attempted && !options.pause.is_zero() {
            tokio::time::sleep(options.pause).await;
        }
        attempted = true;

        let recipient_count = recipients.len();
        let message = compose(event, transport.sender(), recipients, &options.signature);
        let timeout = transport.timeout();
        let outcome = tokio::time::timeout(timeout, transport.send(&message))
            .await
            .unwrap_or(Err(MailError::Timeout(timeout)));

        match outcome {
            Ok(()) => {
                tracing::info!(
                    user_id = %event.user_id,
                    recipients = recipient_count,
                    "Reminder sent"
                );
                report.sent += 1;
                if let Some(date) = event.occurrence_date() {
                    report.delivered.push((event.user_id, date));
                }
            }
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    user_id = %event.user_id,
                    "Failed to send a reminder"
                );
                report.failed += 1;
            }
        }
    }

    report
}
