use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::domain::{DirectoryEntry, Profile, ProfileRecord, UserId};

/// Data the reminder pipeline reads and writes during a cycle
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// All profiles opted into email reminders
    async fn opted_in_profiles(&self) -> anyhow::Result<Vec<Profile>>;

    /// Whether a reminder about `user_id` already went out for `occurrence_date`
    async fn already_notified(
        &self,
        user_id: UserId,
        occurrence_date: NaiveDate,
    ) -> anyhow::Result<bool>;

    /// Remember that a reminder about `user_id` went out for `occurrence_date`
    async fn record_delivery(
        &self,
        user_id: UserId,
        occurrence_date: NaiveDate,
    ) -> anyhow::Result<()>;
}

/// Postgres-backed profile store
#[derive(Clone, Debug)]
pub struct PgProfileStore {
    db_pool: PgPool,
}

impl PgProfileStore {
    pub const fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ReminderStore for PgProfileStore {
    #[tracing::instrument(name = "Get profiles opted into reminders", skip(self))]
    async fn opted_in_profiles(&self) -> anyhow::Result<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r"
            SELECT user_id, full_name, email_id, birthday, marriage_anniversary,
                   timezone, receive_email_reminders
            FROM profiles
            WHERE receive_email_reminders
            ORDER BY user_id
            ",
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Failed to perform a query to fetch profiles opted into reminders")?;

        Ok(profiles)
    }

    #[tracing::instrument(name = "Check reminder delivery", skip(self))]
    async fn already_notified(
        &self,
        user_id: UserId,
        occurrence_date: NaiveDate,
    ) -> anyhow::Result<bool> {
        let found: Option<(i64,)> = sqlx::query_as(
            r"
            SELECT user_id
            FROM reminder_deliveries
            WHERE user_id = $1 AND occurrence_date = $2
            ",
        )
        .bind(user_id)
        .bind(occurrence_date)
        .fetch_optional(&self.db_pool)
        .await
        .context("Failed to perform a query to check reminder deliveries")?;

        Ok(found.is_some())
    }

    #[tracing::instrument(name = "Record reminder delivery", skip(self))]
    async fn record_delivery(
        &self,
        user_id: UserId,
        occurrence_date: NaiveDate,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO reminder_deliveries (user_id, occurrence_date, delivered_at)
            VALUES ($1, $2, now())
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(occurrence_date)
        .execute(&self.db_pool)
        .await
        .context("Failed to record a reminder delivery")?;

        Ok(())
    }
}

/// List the community directory
#[tracing::instrument(name = "Get profile directory", skip(db_pool))]
pub async fn get_directory(db_pool: &PgPool) -> anyhow::Result<Vec<DirectoryEntry>> {
    let entries = sqlx::query_as::<_, DirectoryEntry>(
        r"
        SELECT user_id, full_name, latest_photo, city
        FROM profiles
        WHERE user_id > 0
        ORDER BY full_name NULLS LAST, user_id
        ",
    )
    .fetch_all(db_pool)
    .await
    .context("Failed to perform a query to fetch the profile directory")?;

    Ok(entries)
}

/// Retrieve the profile that matches a `user_id`
#[tracing::instrument(name = "Get profile", skip(db_pool))]
pub async fn get_profile(user_id: UserId, db_pool: &PgPool) -> anyhow::Result<Option<ProfileRecord>> {
    let profile = sqlx::query_as::<_, ProfileRecord>(
        r"
        SELECT user_id, full_name, email_id, street_address, city, state, zip, country,
               phone_number, birthday, marriage_anniversary, timezone, receive_email_reminders,
               current_occupation, company_name, job_role, spouse_name,
               child_1_name, child_2_name, child_3_name, special_message, latest_photo
        FROM profiles
        WHERE user_id = $1
        ",
    )
    .bind(user_id)
    .fetch_optional(db_pool)
    .await
    .context("Failed to perform a query to fetch a profile based on user_id")?;

    Ok(profile)
}

/// Create a profile or replace the stored one with the same `user_id`
#[tracing::instrument(name = "Upsert profile", skip(profile, db_pool), fields(user_id = profile.user_id))]
pub async fn upsert_profile(profile: &ProfileRecord, db_pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r"
        INSERT INTO profiles (
            user_id, full_name, email_id, street_address, city, state, zip, country,
            phone_number, birthday, marriage_anniversary, timezone, receive_email_reminders,
            current_occupation, company_name, job_role, spouse_name,
            child_1_name, child_2_name, child_3_name, special_message, latest_photo, updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
            $14, $15, $16, $17, $18, $19, $20, $21, $22, now()
        )
        ON CONFLICT (user_id) DO UPDATE SET
            full_name = EXCLUDED.full_name,
            email_id = EXCLUDED.email_id,
            street_address = EXCLUDED.street_address,
            city = EXCLUDED.city,
            state = EXCLUDED.state,
            zip = EXCLUDED.zip,
            country = EXCLUDED.country,
            phone_number = EXCLUDED.phone_number,
            birthday = EXCLUDED.birthday,
            marriage_anniversary = EXCLUDED.marriage_anniversary,
            timezone = EXCLUDED.timezone,
            receive_email_reminders = EXCLUDED.receive_email_reminders,
            current_occupation = EXCLUDED.current_occupation,
            company_name = EXCLUDED.company_name,
            job_role = EXCLUDED.job_role,
            spouse_name = EXCLUDED.spouse_name,
            child_1_name = EXCLUDED.child_1_name,
            child_2_name = EXCLUDED.child_2_name,
            child_3_name = EXCLUDED.child_3_name,
            special_message = EXCLUDED.special_message,
            latest_photo = EXCLUDED.latest_photo,
            updated_at = now()
        ",
    )
    .bind(profile.user_id)
    .bind(&profile.full_name)
    .bind(&profile.email_id)
    .bind(&profile.street_address)
    .bind(&profile.city)
    .bind(&profile.state)
    .bind(&profile.zip)
    .bind(&profile.country)
    .bind(&profile.phone_number)
    .bind(profile.birthday)
    .bind(profile.marriage_anniversary)
    .bind(&profile.timezone)
    .bind(profile.receive_email_reminders)
    .bind(&profile.current_occupation)
    .bind(&profile.company_name)
    .bind(&profile.job_role)
    .bind(&profile.spouse_name)
    .bind(&profile.child_1_name)
    .bind(&profile.child_2_name)
    .bind(&profile.child_3_name)
    .bind(&profile.special_message)
    .bind(&profile.latest_photo)
    .execute(db_pool)
    .await
    .context("Failed to upsert a profile")?;

    Ok(())
}
