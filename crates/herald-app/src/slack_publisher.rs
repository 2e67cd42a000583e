use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, error, info, warn};

use herald_core::alert::{Alert, Fingerprint, Status};
use herald_ports::context::Context;
use herald_ports::error::{ChatError, PublishError};
use herald_ports::outbound::{ChatApi, LockStore, Publisher};
use herald_ports::types::{ChatMessage, MessageRef};

pub const LOCK_TTL: Duration = Duration::from_secs(1);
pub const RECORD_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const EMERGENCY_TIMEOUT: Duration = Duration::from_secs(5);

const REACTION_FIRING: &str = "rotating_light";
const REACTION_RESOLVED: &str = "white_check_mark";

/// Posts each distinct message once and threads follow-ups onto the
/// incident's first message.
pub struct SlackPublisher<C, S>
where
    C: ChatApi,
    S: LockStore,
{
    channel_id: String,
    chat: C,
    store: S,
}

/// What one `publish` call has learned so far.
#[derive(Debug, Default)]
struct Delivery {
    delivered: bool,
    thread: Option<String>,
}

impl<C, S> SlackPublisher<C, S>
where
    C: ChatApi,
    S: LockStore,
{
    /// Scopes `store` to this channel so two channels never share keys.
    pub fn new(channel_id: impl Into<String>, chat: C, store: S) -> Self {
        let channel_id = channel_id.into();
        let store = store.with_namespace(&format!("slack/{channel_id}"));
        Self {
            channel_id,
            chat,
            store,
        }
    }

    fn key(&self, source: &str, fingerprint: &Fingerprint) -> String {
        format!("{source}/{}/{fingerprint}", self.channel_id)
    }

    async fn deliver(
        &self,
        ctx: &Context,
        source: &str,
        alert: &Alert,
        message: &ChatMessage,
        delivery: &mut Delivery,
    ) -> Result<(), PublishError> {
        let message_key = self.key(source, &alert.message_fingerprint());
        let thread_key = self.key(source, &alert.incident_fingerprint());

        if recorded(self.store.get(ctx, &message_key).await?).is_some() {
            delivery.delivered = true;
            debug!("alert was already published to slack");
            return Ok(());
        }

        if !self.store.try_lock(ctx, &message_key, LOCK_TTL).await? {
            // a concurrent invocation is about to post the very same message
            delivery.delivered = true;
            return Err(PublishError::AlreadyLocked);
        }

        delivery.thread = recorded(self.store.get(ctx, &thread_key).await?);

        let message_ts = self.post(ctx, message, delivery.thread.as_deref()).await?;
        delivery.delivered = true;
        info!(
            slack_channel = %self.channel_id,
            slack_message_ts = %message_ts,
            slack_thread_ts = delivery.thread.as_deref().unwrap_or_default(),
            "published alert to slack"
        );

        if let Err(err) = self
            .store
            .set(ctx, &message_key, RECORD_TTL, &message_ts)
            .await
        {
            warn!(error = %err, key = %message_key, "failed to record published message");
        }

        let thread_ts = match delivery.thread.clone() {
            Some(thread_ts) => thread_ts,
            None => {
                // the first message of an incident anchors its thread
                if let Err(err) = self
                    .store
                    .set(ctx, &thread_key, RECORD_TTL, &message_ts)
                    .await
                {
                    warn!(error = %err, key = %thread_key, "failed to record thread");
                }
                message_ts
            }
        };

        self.update_reaction(ctx, alert.status, &thread_ts).await;
        Ok(())
    }

    async fn post(
        &self,
        ctx: &Context,
        message: &ChatMessage,
        thread: Option<&str>,
    ) -> Result<String, ChatError> {
        let mut message = message.clone();
        if let Some(thread_ts) = thread {
            message.footer = follow_up_footer(thread_ts);
        }

        self.chat
            .post_message(ctx, &self.channel_id, &message, thread)
            .await
            .inspect_err(|err| {
                error!(
                    error = %err,
                    slack_channel = %self.channel_id,
                    slack_thread_ts = thread.unwrap_or_default(),
                    "error publishing message to slack"
                );
            })
    }

    async fn update_reaction(&self, ctx: &Context, status: Status, thread_ts: &str) {
        let (add, remove) = match status {
            Status::Firing => (REACTION_FIRING, REACTION_RESOLVED),
            Status::Resolved => (REACTION_RESOLVED, REACTION_FIRING),
        };
        let item = MessageRef {
            channel: self.channel_id.clone(),
            timestamp: thread_ts.to_string(),
        };

        match self.chat.add_reaction(ctx, add, &item).await {
            Err(err) if !err.is_already_reacted() => error!(
                error = %err,
                slack_channel = %self.channel_id,
                slack_reaction = add,
                slack_thread_ts = thread_ts,
                "error adding reaction to slack"
            ),
            _ => {}
        }

        match self.chat.remove_reaction(ctx, remove, &item).await {
            Err(err) if !err.is_no_reaction() => error!(
                error = %err,
                slack_channel = %self.channel_id,
                slack_reaction = remove,
                slack_thread_ts = thread_ts,
                "error removing reaction from slack"
            ),
            _ => {}
        }
    }
}

#[async_trait]
impl<C, S> Publisher for SlackPublisher<C, S>
where
    C: ChatApi,
    S: LockStore,
{
    async fn publish(
        &self,
        ctx: &Context,
        source: &str,
        alert: &Alert,
    ) -> Result<(), PublishError> {
        let message = render_message(alert);
        let mut delivery = Delivery::default();

        let result = self
            .deliver(ctx, source, alert, &message, &mut delivery)
            .await;
        if delivery.delivered {
            return result;
        }

        // Whatever went wrong with the bookkeeping, a human gets the alert.
        let emergency = ctx
            .run(
                EMERGENCY_TIMEOUT,
                self.post(ctx, &message, delivery.thread.as_deref()),
            )
            .await;
        match emergency {
            Ok(message_ts) => {
                warn!(slack_message_ts = %message_ts, "emergency-published the alert to slack");
                result
            }
            Err(err) => Err(PublishError::join(result.err(), err.into())),
        }
    }

    fn name(&self) -> &str {
        "slack"
    }
}

fn recorded(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn render_message(alert: &Alert) -> ChatMessage {
    let color = match (alert.status, alert.label("severity")) {
        (Status::Firing, Some("critical")) => "danger",
        (Status::Firing, Some("warning")) => "warning",
        _ => "good",
    };

    let title = format!(
        "{}: {}",
        alert.status.as_str().to_uppercase(),
        alert.alert_name()
    );

    let mut text = String::new();
    if let Some(severity) = alert.label("severity") {
        text.push_str(&format!("Severity: `{severity}`\n"));
    }
    if let Some(summary) = alert.annotation("summary") {
        text.push_str(&format!("Summary: `{summary}`\n"));
    }
    if let Some(description) = alert.annotation("description") {
        text.push_str(&format!("\n{description}\n\n"));
    }
    if let Some(message) = alert.annotation("message") {
        text.push_str(&format!("\n{message}\n\n"));
    }
    if !alert.starts_at.is_empty() {
        text.push_str(&format!("Started at: `{}`\n", alert.starts_at));
    }
    if let Some(account) = alert.label("aws_account") {
        text.push_str(&format!("AWS account: `{account}`\n"));
    }
    if let Some(cluster) = alert.label("cluster") {
        text.push_str(&format!("Kubernetes cluster: `{cluster}`\n"));
    }
    if let Some(namespace) = alert.label("namespace") {
        text.push_str(&format!("Kubernetes namespace: `{namespace}`\n"));
    }

    ChatMessage {
        color: color.to_string(),
        title,
        text,
        footer: String::new(),
    }
}

fn follow_up_footer(thread_ts: &str) -> String {
    match parse_thread_time(thread_ts) {
        Some(at) => format!(
            "(follow-up to the alert published at {})",
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        None => "(follow-up)".to_string(),
    }
}

/// Slack message handles look like `<unix seconds>.<fraction>`. Treated as
/// opaque everywhere else; here only to show when the thread started.
fn parse_thread_time(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs: i64 = secs.parse().ok()?;
    let nanos = if frac.is_empty() {
        0
    } else {
        let digits = &frac[..frac.len().min(9)];
        format!("{digits:0<9}").parse().ok()?
    };
    DateTime::from_timestamp(secs, nanos)
}
