mod pagerduty;

pub use pagerduty::{PagerDutyClient, DEFAULT_EVENTS_URL};
