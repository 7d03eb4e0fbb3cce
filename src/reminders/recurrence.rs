use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// Outcome of evaluating an annual date against the current day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    /// The annual date falls on the member's local "today"
    pub occurs: bool,
    /// Next occurrence on or after the member's local "today"
    pub next_occurrence: Option<NaiveDate>,
}

impl Recurrence {
    const NEVER: Self = Self {
        occurs: false,
        next_occurrence: None,
    };
}

/// Calendar date of `now` as seen in `tz`
pub fn local_today(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Month and day of `stored` placed in `year`; a Feb 29 falls on Mar 1 in non-leap years
pub fn anniversary_in(stored: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, stored.month(), stored.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

/// Decide whether the annual date `stored` recurs today in the member's time zone.
///
/// The stored year is ignored. If this year's occurrence already passed, the next one is
/// computed in the following year, so `next_occurrence` is never in the past.
pub fn is_occurring_today(stored: Option<NaiveDate>, tz: Tz, now: DateTime<Utc>) -> Recurrence {
    let Some(stored) = stored else {
        return Recurrence::NEVER;
    };
    let today = local_today(tz, now);

    let candidate = match anniversary_in(stored, today.year()) {
        Some(c) if c < today => anniversary_in(stored, today.year() + 1),
        other => other,
    };

    candidate.map_or(Recurrence::NEVER, |c| Recurrence {
        occurs: c == today,
        next_occurrence: Some(c),
    })
}
