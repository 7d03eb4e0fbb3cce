use std::sync::Arc;
use std::{io, net, time};

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::configuration::{DatabaseSettings, Settings};
use crate::email_client::MailTransport;
use crate::profile_store::{PgProfileStore, ReminderStore};
use crate::reminders::ReminderPipeline;
use crate::routes::{healthcheck, profile_by_id, profile_directory, run_reminders};

/// Application
pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    /// Build an application based on settings, database pool and reminder pipeline
    pub fn build(
        config: &Settings,
        db_pool: &PgPool,
        pipeline: Arc<ReminderPipeline>,
    ) -> anyhow::Result<Self> {
        let listener = net::TcpListener::bind(format!(
            "{}:{}",
            config.application.app_host, config.application.app_port
        ))?;
        let port = listener.local_addr()?.port();
        let server = run_server(listener, db_pool.clone(), pipeline)?;
        Ok(Self { server, port })
    }

    /// Get application port
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Run application until it is stopped
    pub async fn run_until_stopped(self) -> io::Result<()> {
        self.server.await
    }
}

/// Connect lazily to the database
pub fn get_db_pool(config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(time::Duration::from_secs(2))
        .connect_lazy_with(config.db_options())
}

/// Build the mail transport and make sure it works before anything relies on it
pub async fn get_verified_transport(config: &Settings) -> anyhow::Result<Arc<dyn MailTransport>> {
    let email_client = config.email_client.client()?;
    email_client
        .verify()
        .await
        .context("The mail transport failed verification, refusing to start reminders")?;
    tracing::info!("Mail transport configured successfully");
    Ok(Arc::new(email_client))
}

/// Assemble the reminder pipeline shared by the scheduler and the admin endpoint
pub fn build_pipeline(
    config: &Settings,
    store: Arc<dyn ReminderStore>,
    transport: Arc<dyn MailTransport>,
) -> Arc<ReminderPipeline> {
    Arc::new(ReminderPipeline::new(
        store,
        transport,
        config.reminders.dispatch_options(),
        config.reminders.deduplicate,
    ))
}

/// Build the Postgres-backed reminder pipeline
pub async fn build_pg_pipeline(
    config: &Settings,
    db_pool: &PgPool,
) -> anyhow::Result<Arc<ReminderPipeline>> {
    let transport = get_verified_transport(config).await?;
    let store = Arc::new(PgProfileStore::new(db_pool.clone()));
    Ok(build_pipeline(config, store, transport))
}

/// Run the HTTP server
pub fn run_server(
    listener: net::TcpListener,
    db_pool: PgPool,
    pipeline: Arc<ReminderPipeline>,
) -> anyhow::Result<Server> {
    // Prepare data to be added the application context
    let db_pool = web::Data::new(db_pool);
    let pipeline = web::Data::from(pipeline);

    // Start the HTTP server
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/healthcheck", web::get().to(healthcheck))
            .service(
                web::scope("/api/profile")
                    .route("/all", web::get().to(profile_directory))
                    .route("/{user_id}", web::get().to(profile_by_id)),
            )
            .service(web::scope("/admin").route("/reminders/run", web::get().to(run_reminders)))
            .app_data(db_pool.clone())
            .app_data(pipeline.clone())
    })
    .listen(listener)?
    .run())
}
