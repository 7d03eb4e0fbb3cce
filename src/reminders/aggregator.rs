use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::domain::{EmailAddress, Profile, UserId};
use crate::reminders::recurrence::is_occurring_today;

/// Kind of annual event a reminder is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum EventKind {
    Birthday,
    Anniversary,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Birthday => write!(f, "Birthday"),
            Self::Anniversary => write!(f, "Marriage Anniversary"),
        }
    }
}

/// An annual event falling today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHit {
    pub kind: EventKind,
    pub occurrence_date: NaiveDate,
}

/// Events of a single member that recur today, computed fresh every cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEvent {
    pub user_id: UserId,
    pub full_name: String,
    pub email: EmailAddress,
    pub timezone: Tz,
    pub events: Vec<EventHit>,
}

impl ReminderEvent {
    /// Local date the events fall on
    pub fn occurrence_date(&self) -> Option<NaiveDate> {
        self.events.first().map(|e| e.occurrence_date)
    }
}

/// Resolve the email of an opted-in profile, logging profiles that cannot be reached
fn resolvable_email(profile: &Profile) -> Option<EmailAddress> {
    let Some(raw) = profile.email_id.clone() else {
        tracing::warn!(
            user_id = %profile.user_id,
            "Skipping a profile opted into reminders because it has no email address"
        );
        return None;
    };
    match EmailAddress::parse(raw) {
        Ok(email) => Some(email),
        Err(e) => {
            tracing::warn!(
                user_id = %profile.user_id,
                error.message = %e,
                "Skipping a profile opted into reminders because its stored email is invalid"
            );
            None
        }
    }
}

/// Placeholder for members without a display name, so the subject line never leaks an address
pub const ANONYMOUS_MEMBER: &str = "a fellow member";

/// Opted-in profiles paired with a usable email, resolved once per snapshot
pub struct ReachableProfiles<'a> {
    members: Vec<(&'a Profile, EmailAddress)>,
}

impl<'a> ReachableProfiles<'a> {
    /// Keep opted-in profiles whose email resolves, logging the others once
    pub fn resolve(profiles: &'a [Profile]) -> Self {
        let members = profiles
            .iter()
            .filter(|p| p.receive_email_reminders)
            .filter_map(|p| resolvable_email(p).map(|email| (p, email)))
            .collect();
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Collect the birthdays and anniversaries that fall today, each in its member's time zone
    #[tracing::instrument(
        name = "Collect today's events",
        skip(self),
        fields(profiles = self.members.len())
    )]
    pub fn todays_events(&self, now: DateTime<Utc>) -> Vec<ReminderEvent> {
        self.members
            .iter()
            .filter(|(p, _)| p.birthday.is_some() || p.marriage_anniversary.is_some())
            .filter_map(|(p, email)| todays_event(p, email, now))
            .collect()
    }

    /// Every reachable member, without duplicate mailboxes
    pub fn recipients(&self) -> Vec<EmailAddress> {
        let mut recipients: Vec<EmailAddress> = Vec::new();
        for (_, email) in &self.members {
            if !recipients.iter().any(|r| r.is_same_mailbox(email)) {
                recipients.push(email.clone());
            }
        }
        recipients
    }
}

/// Build the event of a single member, if any of their dates falls today
fn todays_event(p: &Profile, email: &EmailAddress, now: DateTime<Utc>) -> Option<ReminderEvent> {
    let tz = p.time_zone().unwrap_or_else(|e| {
        tracing::warn!(
            user_id = %p.user_id,
            error.message = %e,
            "Evaluating reminders in UTC"
        );
        Tz::UTC
    });

    let events: Vec<EventHit> = [
        (EventKind::Birthday, p.birthday),
        (EventKind::Anniversary, p.marriage_anniversary),
    ]
    .into_iter()
    .filter_map(|(kind, stored)| {
        let recurrence = is_occurring_today(stored, tz, now);
        tracing::debug!(user_id = %p.user_id, %kind, ?recurrence, "Checked annual date");
        recurrence
            .occurs
            .then_some(recurrence.next_occurrence)
            .flatten()
            .map(|occurrence_date| EventHit {
                kind,
                occurrence_date,
            })
    })
    .collect();

    (!events.is_empty()).then(|| ReminderEvent {
        user_id: p.user_id,
        full_name: p
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ANONYMOUS_MEMBER)
            .to_string(),
        email: email.clone(),
        timezone: tz,
        events,
    })
}

/// Collect the birthdays and anniversaries that fall today, each in its member's time zone
pub fn collect_todays_events(profiles: &[Profile], now: DateTime<Utc>) -> Vec<ReminderEvent> {
    ReachableProfiles::resolve(profiles).todays_events(now)
}

/// Every opted-in member that can receive mail, without duplicate mailboxes
pub fn opted_in_recipients(profiles: &[Profile]) -> Vec<EmailAddress> {
    ReachableProfiles::resolve(profiles).recipients()
}
