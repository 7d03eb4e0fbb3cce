use std::fmt;

use chrono::NaiveDate;
use chrono_tz::Tz;

/// Member identifier, assigned at account creation
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The part of a member profile the reminder engine looks at
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Profile {
    pub user_id: UserId,
    pub full_name: Option<String>,
    pub email_id: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub marriage_anniversary: Option<NaiveDate>,
    pub timezone: Option<String>,
    pub receive_email_reminders: bool,
}

impl Profile {
    /// Resolve the member's time zone, defaulting to UTC when none is stored
    pub fn time_zone(&self) -> Result<Tz, String> {
        match self.timezone.as_deref().map(str::trim) {
            None | Some("") => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| format!("`{name}` is not a known time zone")),
        }
    }
}

/// Complete member profile as stored and served by the directory API
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct ProfileRecord {
    pub user_id: i64,
    pub full_name: Option<String>,
    pub email_id: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub phone_number: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub marriage_anniversary: Option<NaiveDate>,
    pub timezone: Option<String>,
    pub receive_email_reminders: bool,
    pub current_occupation: Option<String>,
    pub company_name: Option<String>,
    pub job_role: Option<String>,
    pub spouse_name: Option<String>,
    pub child_1_name: Option<String>,
    pub child_2_name: Option<String>,
    pub child_3_name: Option<String>,
    pub special_message: Option<String>,
    pub latest_photo: Option<String>,
}

/// Community directory entry
#[derive(Clone, Debug, serde::Serialize, sqlx::FromRow)]
pub struct DirectoryEntry {
    pub user_id: i64,
    pub full_name: Option<String>,
    pub latest_photo: Option<String>,
    pub city: Option<String>,
}
