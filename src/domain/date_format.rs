use chrono::NaiveDate;

/// Fixed textual representation of calendar dates used in reminder messages
const DDMMYYYY: &str = "%d%m%Y";

/// Format a calendar date as `DDMMYYYY`
pub fn format_ddmmyyyy(date: NaiveDate) -> String {
    date.format(DDMMYYYY).to_string()
}

/// Parse a `DDMMYYYY` string, returning `None` if it is not exactly 8 digits or not a real date
pub fn parse_ddmmyyyy(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, DDMMYYYY).ok()
}
