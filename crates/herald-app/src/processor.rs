use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, info, info_span, Instrument};

use herald_core::alert::{Alert, AlertGroup};
use herald_core::matcher::LabelMatcher;
use herald_ports::context::Context;
use herald_ports::inbound::AlertGroupHandler;
use herald_ports::outbound::Publisher;

use crate::error::AppError;

/// Static filtering rules, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct ProcessorConfig {
    /// Alert names that are never delivered.
    pub ignore_rules: BTreeSet<String>,
    pub match_labels: LabelMatcher,
}

pub struct Processor {
    config: ProcessorConfig,
    publishers: Vec<Box<dyn Publisher>>,
}

impl Processor {
    pub fn new(
        config: ProcessorConfig,
        publishers: Vec<Box<dyn Publisher>>,
    ) -> Result<Self, AppError> {
        if publishers.is_empty() {
            return Err(AppError::NoPublishers);
        }
        Ok(Self { config, publishers })
    }

    /// Delivers every alert in `group`. One alert failing never stops the
    /// others; all failures come back joined.
    pub async fn process_group(
        &self,
        ctx: &Context,
        source: &str,
        group: AlertGroup,
    ) -> Result<(), AppError> {
        let mut errors = Vec::new();
        for alert in group.into_merged_alerts() {
            if let Err(err) = self.process_alert(ctx, source, alert).await {
                errors.push(err);
            }
        }
        AppError::join(errors)
    }

    async fn process_alert(
        &self,
        ctx: &Context,
        source: &str,
        mut alert: Alert,
    ) -> Result<(), AppError> {
        if !alert.normalize_starts_at() {
            debug!(
                parent: ctx.span(),
                starts_at = %alert.starts_at,
                "leaving unrecognised start time as is"
            );
        }

        let span = info_span!(
            parent: ctx.span(),
            "alert",
            alertname = %alert.alert_name(),
            message_fingerprint = %alert.message_fingerprint(),
            incident_fingerprint = %alert.incident_fingerprint()
        );
        let ctx = ctx.with_span(span);

        if self.config.ignore_rules.contains(alert.alert_name()) {
            info!(
                parent: ctx.span(),
                "skipped the alert according to ignore-rules configuration"
            );
            return Ok(());
        }

        if let Some((label, expected)) = self.config.match_labels.mismatch(&alert.labels) {
            info!(
                parent: ctx.span(),
                label,
                expected,
                "skipped the alert due to label mismatch"
            );
            return Ok(());
        }

        let mut errors = Vec::new();
        for publisher in &self.publishers {
            let result = publisher
                .publish(&ctx, source, &alert)
                .instrument(ctx.span().clone())
                .await;
            match result {
                Ok(()) => {}
                Err(err) if err.is_transient() => info!(
                    parent: ctx.span(),
                    publisher = publisher.name(),
                    "concurrent delivery in progress, leaving it to the lock holder"
                ),
                Err(err) => errors.push(AppError::Publish {
                    publisher: publisher.name().to_string(),
                    source: err,
                }),
            }
        }
        AppError::join(errors)
    }
}

#[async_trait]
impl AlertGroupHandler for Processor {
    type Error = AppError;

    async fn handle_group(
        &self,
        ctx: &Context,
        source: &str,
        group: AlertGroup,
    ) -> Result<(), AppError> {
        self.process_group(ctx, source, group).await
    }
}
