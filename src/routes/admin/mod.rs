mod reminders;

pub use reminders::*;
