use std::future;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::configuration::ReminderSettings;
use crate::reminders::{ReminderError, ReminderPipeline};

/// Background worker running the reminder pipeline on a cron schedule
pub struct ReminderWorker {
    scheduler: JobScheduler,
    pipeline: Arc<ReminderPipeline>,
    run_on_startup: bool,
}

impl ReminderWorker {
    /// Build the worker, failing on an unknown time zone or an invalid schedule
    pub async fn build(
        settings: &ReminderSettings,
        pipeline: Arc<ReminderPipeline>,
    ) -> anyhow::Result<Self> {
        let timezone = settings
            .schedule_timezone()
            .map_err(anyhow::Error::msg)
            .context("Invalid reminder schedule time zone")?;
        let scheduler = JobScheduler::new()
            .await
            .context("Failed to create the reminder scheduler")?;

        let job_pipeline = pipeline.clone();
        let job = Job::new_async_tz(settings.schedule.as_str(), timezone, move |_id, _lock| {
            let pipeline = job_pipeline.clone();
            Box::pin(async move {
                tracing::info!("Running scheduled reminder job");
                run_once(&pipeline).await;
            })
        })
        .with_context(|| format!("Invalid reminder schedule `{}`", settings.schedule))?;
        let job_id = scheduler
            .add(job)
            .await
            .context("Failed to register the reminder job")?;
        tracing::debug!(
            cron = %settings.schedule,
            timezone = %timezone,
            job_id = %job_id,
            "Registered reminder job"
        );

        Ok(Self {
            scheduler,
            pipeline,
            run_on_startup: settings.run_on_startup,
        })
    }

    /// Run worker until it is stopped
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        if self.run_on_startup {
            tracing::info!("Running reminders immediately on startup");
            run_once(&self.pipeline).await;
        }

        self.scheduler
            .start()
            .await
            .context("Failed to start the reminder scheduler")?;

        // Jobs run on the scheduler's own tasks
        future::pending::<()>().await;
        Ok(())
    }
}

/// Run a cycle, reporting the outcome in the logs only
async fn run_once(pipeline: &ReminderPipeline) {
    match pipeline.run_cycle(Utc::now()).await {
        Ok(report) => tracing::info!(
            sent = report.sent,
            failed = report.failed,
            "Reminder job completed"
        ),
        Err(ReminderError::AlreadyRunning) => {
            tracing::warn!("Skipping reminder job because a previous cycle is still running");
        }
        Err(e) => tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "Reminder job failed"
        ),
    }
}
