use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use herald_core::alert::{Alert, Severity, Status};
use herald_ports::context::Context;
use herald_ports::error::{PagingError, PublishError};
use herald_ports::outbound::{PagingApi, Publisher};
use herald_ports::types::{EventAction, PagingEvent, PagingLink, PagingPayload};

pub const META_EVENT_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_ERROR_LEN: usize = 1024;
const SELF_SOURCE: &str = "herald";

/// Pages through PagerDuty. Holds no state of its own: the incident
/// fingerprint is sent as the dedup key and the service tracks the
/// incident lifecycle.
pub struct PagerDutyPublisher<P>
where
    P: PagingApi,
{
    integration_key: String,
    client: P,
}

impl<P> PagerDutyPublisher<P>
where
    P: PagingApi,
{
    pub fn new(integration_key: impl Into<String>, client: P) -> Self {
        Self {
            integration_key: integration_key.into(),
            client,
        }
    }

    pub fn build_event(&self, source: &str, alert: &Alert) -> PagingEvent {
        let event_action = match alert.status {
            Status::Resolved => EventAction::Resolve,
            Status::Firing => EventAction::Trigger,
        };

        let mut links = Vec::new();
        let mut add_link = |href: &str, text: &str| {
            if !href.is_empty() {
                links.push(PagingLink {
                    href: href.to_string(),
                    text: text.to_string(),
                });
            }
        };
        add_link(alert.annotation("runbook_url").unwrap_or_default(), "📕 Runbook");
        add_link(&alert.generator_url, "📈 Expr");
        add_link(&alert.silence_url, "🔕 Silence");

        // the batch source, unless the alert names its own
        let client = alert
            .label("source")
            .filter(|s| !s.is_empty())
            .unwrap_or(source);

        let mut summary = alert.alert_name().to_string();
        if let Some(text) = alert.annotation("summary").filter(|s| !s.is_empty()) {
            summary.push_str(": ");
            summary.push_str(text);
        }

        // "instance" is always set by the scraper, "instance_name" is optional
        let payload_source = alert
            .label("instance_name")
            .filter(|s| !s.is_empty())
            .or_else(|| alert.label("instance"))
            .unwrap_or_default();

        let mut custom_details: BTreeMap<String, String> = alert.labels.clone();
        custom_details.remove("severity");
        custom_details.remove("alertname");
        custom_details.extend(alert.annotations.clone());
        custom_details.remove("summary");

        PagingEvent {
            routing_key: self.integration_key.clone(),
            event_action,
            dedup_key: Some(alert.incident_fingerprint().to_string()),
            client: non_empty(client),
            client_url: non_empty(&alert.generator_url),
            links,
            payload: PagingPayload {
                summary,
                source: payload_source.to_string(),
                severity: Severity::from_label(alert.label("severity")),
                timestamp: non_empty(&alert.starts_at),
                class: non_empty(alert.alert_name()),
                custom_details,
            },
        }
    }

    async fn send(&self, ctx: &Context, event: &PagingEvent) -> Result<(), PagingError> {
        let resp = self.client.send_event(ctx, event).await?;
        if !resp.errors.is_empty() {
            return Err(PagingError::Rejected(resp.errors));
        }
        Ok(())
    }

    /// Opens a separate, un-deduplicated incident about the failure itself.
    /// Its own failure is only logged.
    async fn report_failure(&self, ctx: &Context, err: &PagingError) {
        let mut details = BTreeMap::new();
        details.insert(
            "err".to_string(),
            truncate(&err.to_string(), MAX_ERROR_LEN).to_string(),
        );
        details.insert(
            "text".to_string(),
            "Check herald logs for more details".to_string(),
        );

        let event = PagingEvent {
            routing_key: self.integration_key.clone(),
            event_action: EventAction::Trigger,
            dedup_key: None,
            client: None,
            client_url: None,
            links: Vec::new(),
            payload: PagingPayload {
                summary: "Failed to post alert to pagerduty".to_string(),
                source: SELF_SOURCE.to_string(),
                severity: Severity::Critical,
                timestamp: None,
                class: None,
                custom_details: details,
            },
        };

        let ctx = ctx.detached();
        match ctx
            .run(META_EVENT_TIMEOUT, self.send(&ctx, &event))
            .await
        {
            Ok(()) => info!("published error alert to pagerduty"),
            Err(err) => error!(error = %err, "failed to publish error alert to pagerduty"),
        }
    }
}

#[async_trait]
impl<P> Publisher for PagerDutyPublisher<P>
where
    P: PagingApi,
{
    async fn publish(
        &self,
        ctx: &Context,
        source: &str,
        alert: &Alert,
    ) -> Result<(), PublishError> {
        let event = self.build_event(source, alert);
        info!(
            dedup_key = event.dedup_key.as_deref().unwrap_or_default(),
            action = ?event.event_action,
            severity = event.payload.severity.as_str(),
            "publishing alert to pagerduty"
        );

        match self.send(ctx, &event).await {
            Ok(()) => {
                info!("successfully published to pagerduty");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to publish alert to pagerduty");
                self.report_failure(ctx, &err).await;
                Err(err.into())
            }
        }
    }

    fn name(&self) -> &str {
        "pagerduty"
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Cuts `s` to at most `max` bytes without splitting a character.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
