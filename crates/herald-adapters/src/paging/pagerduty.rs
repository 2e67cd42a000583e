use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use herald_ports::context::Context;
use herald_ports::error::PagingError;
use herald_ports::outbound::PagingApi;
use herald_ports::types::{PagingEvent, PagingResponse};

pub const DEFAULT_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct PagerDutyClient {
    http: Client,
    events_url: String,
}

impl PagerDutyClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            events_url: DEFAULT_EVENTS_URL.to_string(),
        }
    }

    pub fn with_events_url(mut self, events_url: impl Into<String>) -> Self {
        self.events_url = events_url.into();
        self
    }
}

impl Default for PagerDutyClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PagingApi for PagerDutyClient {
    async fn send_event(
        &self,
        ctx: &Context,
        event: &PagingEvent,
    ) -> Result<PagingResponse, PagingError> {
        ctx.run(REQUEST_TIMEOUT, async {
            let response = self
                .http
                .post(&self.events_url)
                .json(event)
                .send()
                .await
                .map_err(|e| PagingError::Transport(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| PagingError::Transport(e.to_string()))?;

            if status.is_success() {
                return serde_json::from_str(&body)
                    .map_err(|e| PagingError::Transport(format!("unreadable response: {e}")));
            }

            // 400s carry the validation errors in the body
            match serde_json::from_str::<PagingResponse>(&body) {
                Ok(resp) if !resp.errors.is_empty() => Err(PagingError::Rejected(resp.errors)),
                _ => Err(PagingError::Status {
                    status: status.as_u16(),
                    body,
                }),
            }
        })
        .await
    }
}
