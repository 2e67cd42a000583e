pub mod error;
pub mod pagerduty_publisher;
pub mod processor;
pub mod slack_publisher;
pub mod sns_decoder;

#[cfg(test)]
mod mocks;
