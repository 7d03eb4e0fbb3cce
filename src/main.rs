use std::io;

use anyhow::Context;

use alumni::configuration::Settings;
use alumni::reminder_worker::ReminderWorker;
use alumni::startup::{build_pg_pipeline, get_db_pool, Application};
use alumni::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
#[allow(clippy::redundant_pub_crate)]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = get_subscriber("alumni".into(), "info".into(), io::stdout);
    init_subscriber(subscriber);

    // Retrieve settings
    let config = Settings::get_config().context("Failed to load configuration")?;

    // Share one reminder pipeline between the HTTP server and the scheduler
    let db_pool = get_db_pool(&config.database);
    let pipeline = build_pg_pipeline(&config, &db_pool).await?;

    // Prepare the application and the reminder worker
    let application = Application::build(&config, &db_pool, pipeline.clone())?.run_until_stopped();
    let worker = ReminderWorker::build(&config.reminders, pipeline)
        .await?
        .run_until_stopped();

    // Run both tasks concurrently, return as soon as one of the tasks completes or errors out
    tokio::select! {
        outcome = application => outcome.context("The HTTP server failed")?,
        outcome = worker => outcome.context("The reminder worker failed")?,
    }

    Ok(())
}
