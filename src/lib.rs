pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod profile_store;
pub mod reminder_worker;
pub mod reminders;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod utils;
