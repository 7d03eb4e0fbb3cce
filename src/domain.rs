mod date_format;
mod email_address;
mod profile;

pub use date_format::{format_ddmmyyyy, parse_ddmmyyyy};
pub use email_address::EmailAddress;
pub use profile::{DirectoryEntry, Profile, ProfileRecord, UserId};
