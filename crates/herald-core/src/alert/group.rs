use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Alert, Status};

/// A batch of alerts sharing common labels and annotations, as carried in a
/// single webhook notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertGroup {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub common_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub common_annotations: BTreeMap<String, String>,
}

impl AlertGroup {
    pub fn single(alert: Alert) -> Self {
        Self {
            status: Some(alert.status),
            alerts: vec![alert],
            ..Default::default()
        }
    }

    /// Consumes the group, returning every alert with the common labels and
    /// annotations merged in.
    pub fn into_merged_alerts(self) -> Vec<Alert> {
        let Self {
            alerts,
            common_labels,
            common_annotations,
            ..
        } = self;
        alerts
            .into_iter()
            .map(|mut alert| {
                alert.merge_common(&common_labels, &common_annotations);
                alert
            })
            .collect()
    }
}
