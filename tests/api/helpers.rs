use std::sync::{Arc, Mutex};
use std::{env, io, sync};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use fdlimit::raise_fd_limit;
use sqlx::PgPool;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alumni::configuration::Settings;
use alumni::domain::{Profile, UserId};
use alumni::profile_store::ReminderStore;
use alumni::startup::{build_pipeline, get_db_pool, get_verified_transport, Application};
use alumni::telemetry::{get_subscriber, init_subscriber};

/// Ensure the tracing stack is initialized only once
static TRACING: sync::LazyLock<()> = sync::LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(
            subscriber_name,
            default_filter_level,
            io::stdout,
        ));
    } else {
        init_subscriber(get_subscriber(
            subscriber_name,
            default_filter_level,
            io::sink,
        ));
    };
});

/// In-memory stand-in for the profile store
#[derive(Default)]
pub struct TestStore {
    pub profiles: Vec<Profile>,
    pub deliveries: Mutex<Vec<(UserId, NaiveDate)>>,
    pub unreachable: bool,
}

#[async_trait]
impl ReminderStore for TestStore {
    async fn opted_in_profiles(&self) -> anyhow::Result<Vec<Profile>> {
        if self.unreachable {
            anyhow::bail!("connection refused");
        }
        Ok(self
            .profiles
            .iter()
            .filter(|p| p.receive_email_reminders)
            .cloned()
            .collect())
    }

    async fn already_notified(&self, user_id: UserId, date: NaiveDate) -> anyhow::Result<bool> {
        Ok(self.deliveries.lock().unwrap().contains(&(user_id, date)))
    }

    async fn record_delivery(&self, user_id: UserId, date: NaiveDate) -> anyhow::Result<()> {
        self.deliveries.lock().unwrap().push((user_id, date));
        Ok(())
    }
}

/// Test application data
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spin up a test application backed by an in-memory store
    pub async fn spawn(store: TestStore) -> Self {
        let config = test_config(None);
        let db_pool = get_db_pool(&config.database);
        Self::spawn_with(store, &db_pool).await
    }

    /// Spin up a test application using the provided database pool for profile routes
    pub async fn spawn_with(store: TestStore, db_pool: &PgPool) -> Self {
        // Initialize logging
        sync::LazyLock::force(&TRACING);

        // Raise file descriptors limit to avoid "Too many open files" error
        raise_fd_limit().expect("Failed to raise fd limit");

        // Launch a mock server to stand in for Postmark's API, accepting the startup verification
        let email_server = MockServer::start().await;
        Mock::given(path("/server"))
            .and(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .named("Verify mail transport")
            .mount(&email_server)
            .await;
        let config = test_config(Some(email_server.uri()));

        // Build the reminder pipeline and the application
        let transport = get_verified_transport(&config)
            .await
            .expect("Failed to verify mail transport");
        let pipeline = build_pipeline(&config, Arc::new(store), transport);
        let app = Application::build(&config, db_pool, pipeline)
            .expect("Failed to build application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{port}");

        // Build the API client
        let api_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        // Run the application and return its data
        #[allow(clippy::let_underscore_future)]
        let _ = tokio::spawn(app.run_until_stopped());
        Self {
            address,
            port,
            email_server,
            api_client,
        }
    }

    /// GET the admin endpoint that triggers a reminder cycle
    pub async fn trigger_reminders(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/admin/reminders/run", &self.address))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// GET a path of the profile API
    pub async fn get_profile_api(&self, route: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}/api/profile/{route}", &self.address))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Email requests received by the Postmark mock, as JSON
    pub async fn sent_emails(&self) -> Vec<serde_json::Value> {
        self.email_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/email")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}

/// Get settings and modify them for testing
pub fn test_config(email_api: Option<String>) -> Settings {
    let mut c = Settings::get_config().expect("Failed to read configuration");
    // Listen on a random TCP port
    c.application.app_port = 0;
    // Use the mock server as email API
    if let Some(uri) = email_api {
        c.email_client.base_url = uri;
    }
    // Do not slow tests down
    c.reminders.send_pause_millis = 0;
    c
}

/// Opted-in profile in UTC
pub fn member(id: i64, email: &str) -> Profile {
    Profile {
        user_id: UserId::new(id),
        full_name: Some(format!("Member {id}")),
        email_id: Some(email.to_string()),
        birthday: None,
        marriage_anniversary: None,
        timezone: Some("UTC".to_string()),
        receive_email_reminders: true,
    }
}

/// A date in a leap year whose month and day are today's (UTC)
pub fn birthday_today() -> Option<NaiveDate> {
    let today = Utc::now().date_naive();
    NaiveDate::from_ymd_opt(1992, today.month(), today.day())
}

/// A date whose month and day are never today's (UTC)
pub fn birthday_not_today() -> Option<NaiveDate> {
    let tomorrow = Utc::now().date_naive().succ_opt()?;
    NaiveDate::from_ymd_opt(1992, tomorrow.month(), tomorrow.day())
}
