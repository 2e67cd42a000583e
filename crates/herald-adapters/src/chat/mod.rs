mod slack;

pub use slack::{SlackClient, DEFAULT_API_URL};
