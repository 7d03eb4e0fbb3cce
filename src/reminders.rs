mod aggregator;
mod dispatcher;
mod pipeline;
mod recurrence;

pub use aggregator::{
    collect_todays_events, opted_in_recipients, EventHit, EventKind, ReachableProfiles,
    ReminderEvent, ANONYMOUS_MEMBER,
};
pub use dispatcher::{dispatch, DispatchOptions, DispatchReport};
pub use pipeline::{ReminderError, ReminderPipeline};
pub use recurrence::{anniversary_in, is_occurring_today, local_today, Recurrence};
