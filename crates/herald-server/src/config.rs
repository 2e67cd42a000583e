use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::Args;

use herald_adapters::chat::{SlackClient, DEFAULT_API_URL};
use herald_adapters::paging::{PagerDutyClient, DEFAULT_EVENTS_URL};
use herald_adapters::persistence::sqlite::SqliteLockStore;
use herald_app::pagerduty_publisher::PagerDutyPublisher;
use herald_app::processor::{Processor, ProcessorConfig};
use herald_app::slack_publisher::SlackPublisher;
use herald_core::matcher::LabelMatcher;
use herald_ports::outbound::Publisher;

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    #[arg(long, env = "HERALD_DATABASE_URL", default_value = "sqlite://herald.db?mode=rwc")]
    pub database_url: String,

    /// Table holding locks and delivery records.
    #[arg(long, env = "HERALD_TABLE", default_value = "herald_locks")]
    pub table: String,
}

impl StoreArgs {
    pub async fn connect(&self) -> anyhow::Result<SqliteLockStore> {
        SqliteLockStore::connect(&self.database_url, &self.table)
            .await
            .with_context(|| format!("failed to open the store at {}", self.database_url))
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Alert names never delivered.
    #[arg(long, env = "HERALD_IGNORE_RULES", value_delimiter = ',')]
    pub ignore_rules: Vec<String>,

    /// `label=value` pairs an alert must carry to be delivered.
    #[arg(long, env = "HERALD_MATCH_LABELS", value_delimiter = ',')]
    pub match_labels: Vec<String>,
}

impl FilterArgs {
    pub fn processor_config(&self) -> anyhow::Result<ProcessorConfig> {
        let ignore_rules: BTreeSet<String> = self
            .ignore_rules
            .iter()
            .map(|rule| rule.trim())
            .filter(|rule| !rule.is_empty())
            .map(str::to_string)
            .collect();
        let pairs: Vec<&str> = self
            .match_labels
            .iter()
            .map(String::as_str)
            .filter(|pair| !pair.trim().is_empty())
            .collect();
        let match_labels = LabelMatcher::parse(&pairs).context("invalid --match-labels")?;

        Ok(ProcessorConfig {
            ignore_rules,
            match_labels,
        })
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct SlackArgs {
    #[arg(long, env = "HERALD_SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    #[arg(long, env = "HERALD_SLACK_CHANNEL_ID")]
    pub slack_channel_id: Option<String>,

    #[arg(long, env = "HERALD_SLACK_API_URL", default_value = DEFAULT_API_URL)]
    pub slack_api_url: String,
}

impl SlackArgs {
    /// `(token, channel id)` when slack delivery is enabled.
    pub fn credentials(&self) -> anyhow::Result<Option<(&str, &str)>> {
        let token = self.slack_token.as_deref().filter(|t| !t.is_empty());
        let channel = self.slack_channel_id.as_deref().filter(|c| !c.is_empty());
        match (token, channel) {
            (None, _) => Ok(None),
            (Some(_), None) => bail!("slack channel id is required when a slack token is set"),
            (Some(token), Some(channel)) => Ok(Some((token, channel))),
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct PagerDutyArgs {
    #[arg(long, env = "HERALD_PAGERDUTY_INTEGRATION_KEY", hide_env_values = true)]
    pub pagerduty_integration_key: Option<String>,

    #[arg(long, env = "HERALD_PAGERDUTY_EVENTS_URL", default_value = DEFAULT_EVENTS_URL)]
    pub pagerduty_events_url: String,
}

impl PagerDutyArgs {
    pub fn integration_key(&self) -> Option<&str> {
        self.pagerduty_integration_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Args)]
pub struct ProcessArgs {
    /// File holding the SNS event; stdin when omitted.
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub slack: SlackArgs,

    #[command(flatten)]
    pub pagerduty: PagerDutyArgs,
}

impl ProcessArgs {
    /// Builds the processor with every enabled publisher. The store is only
    /// opened when a publisher needs it.
    pub async fn build_processor(&self) -> anyhow::Result<Processor> {
        let config = self.filters.processor_config()?;
        let mut publishers: Vec<Box<dyn Publisher>> = Vec::new();

        if let Some((token, channel)) = self.slack.credentials()? {
            let store = self.store.connect().await?;
            let client = SlackClient::new(token).with_api_url(&self.slack.slack_api_url);
            publishers.push(Box::new(SlackPublisher::new(channel, client, store)));
        }

        if let Some(key) = self.pagerduty.integration_key() {
            let client =
                PagerDutyClient::new().with_events_url(&self.pagerduty.pagerduty_events_url);
            publishers.push(Box::new(PagerDutyPublisher::new(key, client)));
        }

        Ok(Processor::new(config, publishers)?)
    }
}
