use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use herald_core::alert::timestamp::format_prometheus;
use herald_core::alert::{Alert, AlertGroup, Status};
use herald_ports::context::Context;
use herald_ports::inbound::AlertGroupHandler;

use crate::error::AppError;

/// Source reported for alerts herald raises about itself.
pub const SELF_SOURCE: &str = "herald";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SnsEventRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnsEventRecord {
    #[serde(rename = "Sns")]
    pub sns: SnsMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnsMessage {
    #[serde(rename = "TopicArn", default)]
    pub topic_arn: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

pub struct SnsDecoder<H>
where
    H: AlertGroupHandler<Error = AppError>,
{
    handler: H,
}

impl<H> SnsDecoder<H>
where
    H: AlertGroupHandler<Error = AppError>,
{
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Hands every record to the handler. A record that fails to decode is
    /// skipped; once the batch is done a synthetic alert about it goes
    /// through the same handler so operators hear about dropped input.
    pub async fn process_event(&self, ctx: &Context, event: SnsEvent) -> Result<(), AppError> {
        let mut errors = Vec::new();
        let mut decode_failures = 0usize;

        for record in event.records {
            let SnsMessage { topic_arn, message } = record.sns;
            let group = match serde_json::from_str::<AlertGroup>(&message) {
                Ok(group) => group,
                Err(err) => {
                    error!(
                        parent: ctx.span(),
                        message = %message.replace('\n', " "),
                        error = %err,
                        "error un-marshalling message"
                    );
                    decode_failures += 1;
                    errors.push(AppError::Decode(err));
                    continue;
                }
            };
            if let Err(err) = self.handler.handle_group(ctx, &topic_arn, group).await {
                errors.push(err);
            }
        }

        if decode_failures > 0 {
            let group = AlertGroup::single(parse_error_alert());
            if let Err(err) = self.handler.handle_group(ctx, SELF_SOURCE, group).await {
                error!(parent: ctx.span(), error = %err, "failed to send parse error alert");
            }
        }

        AppError::join(errors)
    }
}

fn parse_error_alert() -> Alert {
    Alert {
        status: Status::Firing,
        starts_at: format_prometheus(Utc::now()),
        labels: BTreeMap::from([
            ("alertname".to_string(), "HeraldParseError".to_string()),
            ("severity".to_string(), "critical".to_string()),
        ]),
        annotations: BTreeMap::from([
            (
                "summary".to_string(),
                "Failed to parse SNS messages".to_string(),
            ),
            (
                "description".to_string(),
                "herald failed to process some alerts. Check its logs for more details."
                    .to_string(),
            ),
        ]),
        ..Default::default()
    }
}
