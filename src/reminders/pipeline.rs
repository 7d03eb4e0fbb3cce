use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::email_client::MailTransport;
use crate::profile_store::ReminderStore;
use crate::reminders::aggregator::{ReachableProfiles, ReminderEvent};
use crate::reminders::dispatcher::{dispatch, DispatchOptions, DispatchReport};
use crate::utils::error_chain_fmt;

/// Reminder cycle error type
#[derive(thiserror::Error)]
pub enum ReminderError {
    #[error("A reminder cycle is already running")]
    AlreadyRunning,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for ReminderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Flips the pipeline back to idle when a cycle ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Load profiles, collect today's events and dispatch them, one cycle at a time
pub struct ReminderPipeline {
    store: Arc<dyn ReminderStore>,
    transport: Arc<dyn MailTransport>,
    options: DispatchOptions,
    deduplicate: bool,
    running: AtomicBool,
}

impl ReminderPipeline {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        transport: Arc<dyn MailTransport>,
        options: DispatchOptions,
        deduplicate: bool,
    ) -> Self {
        Self {
            store,
            transport,
            options,
            deduplicate,
            running: AtomicBool::new(false),
        }
    }

    /// Whether a cycle is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Move from idle to running, or refuse if another cycle holds the flag
    fn try_start(&self) -> Result<RunningGuard<'_>, ReminderError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| RunningGuard(&self.running))
            .map_err(|_| ReminderError::AlreadyRunning)
    }

    /// Run a full reminder cycle as of `now`
    #[tracing::instrument(name = "Run reminder cycle", skip(self), err)]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<DispatchReport, ReminderError> {
        let _guard = self.try_start()?;

        let profiles = self.store.opted_in_profiles().await?;
        let reachable = ReachableProfiles::resolve(&profiles);
        let mut events = reachable.todays_events(now);
        if self.deduplicate {
            events = self.drop_already_notified(events).await?;
        }
        if events.is_empty() {
            tracing::info!("No reminders to send today");
            return Ok(DispatchReport::default());
        }

        let recipients = reachable.recipients();
        let report = dispatch(self.transport.as_ref(), &events, &recipients, &self.options).await;

        if self.deduplicate {
            for (user_id, date) in &report.delivered {
                if let Err(e) = self.store.record_delivery(*user_id, *date).await {
                    tracing::error!(
                        error.cause_chain = ?e,
                        error.message = %e,
                        user_id = %user_id,
                        "Failed to record a reminder delivery"
                    );
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Finished processing reminders"
        );
        Ok(report)
    }

    /// Drop events whose reminder already went out in an earlier cycle
    async fn drop_already_notified(
        &self,
        events: Vec<ReminderEvent>,
    ) -> anyhow::Result<Vec<ReminderEvent>> {
        let mut pending = Vec::with_capacity(events.len());
        for event in events {
            let Some(date) = event.occurrence_date() else {
                continue;
            };
            if self
                .store
                .already_notified(event.user_id, date)
                .await
                .context("Failed to check previous reminder deliveries")?
            {
                tracing::info!(user_id = %event.user_id, "Reminder already delivered today");
            } else {
                pending.push(event);
            }
        }
        Ok(pending)
    }
}
