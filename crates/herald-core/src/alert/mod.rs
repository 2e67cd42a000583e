pub mod fingerprint;
pub mod group;
pub mod severity;
pub mod status;
pub mod timestamp;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use fingerprint::Fingerprint;
pub use group::AlertGroup;
pub use severity::Severity;
pub use status::Status;

/// One monitoring notification as delivered by Alertmanager or Grafana.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub status: Status,
    #[serde(default)]
    pub starts_at: String,
    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,
    /// Set by Grafana by default; any Alertmanager template may add it.
    #[serde(default, rename = "silenceURL")]
    pub silence_url: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Alert {
    pub fn incident_fingerprint(&self) -> Fingerprint {
        Fingerprint::incident(self)
    }

    pub fn message_fingerprint(&self) -> Fingerprint {
        Fingerprint::message(self)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn alert_name(&self) -> &str {
        self.label("alertname").unwrap_or_default()
    }

    /// Fills in batch-level defaults. Keys the alert already defines win.
    pub fn merge_common(
        &mut self,
        labels: &BTreeMap<String, String>,
        annotations: &BTreeMap<String, String>,
    ) {
        for (k, v) in labels {
            self.labels.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in annotations {
            self.annotations.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    /// Rewrites `starts_at` into the canonical format when it parses;
    /// leaves it untouched otherwise.
    pub fn normalize_starts_at(&mut self) -> bool {
        match timestamp::normalize(&self.starts_at) {
            Some(normalized) => {
                self.starts_at = normalized;
                true
            }
            None => false,
        }
    }
}
