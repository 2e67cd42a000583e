use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use herald_core::alert::Severity;

/// A chat message rendered as a single colored attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub color: String,
    pub title: String,
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub footer: String,
}

/// Addresses one posted chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Trigger,
    Resolve,
}

/// A paging service event (PagerDuty Events API v2 shape).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagingEvent {
    pub routing_key: String,
    pub event_action: EventAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<PagingLink>,
    pub payload: PagingPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagingPayload {
    pub summary: String,
    pub source: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagingLink {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PagingResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub dedup_key: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_event_omits_empty_fields() {
        let event = PagingEvent {
            routing_key: "key".into(),
            event_action: EventAction::Trigger,
            dedup_key: None,
            client: None,
            client_url: None,
            links: vec![],
            payload: PagingPayload {
                summary: "down".into(),
                source: "web-01".into(),
                severity: Severity::Warning,
                timestamp: None,
                class: None,
                custom_details: BTreeMap::new(),
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "routing_key": "key",
                "event_action": "trigger",
                "payload": {"summary": "down", "source": "web-01", "severity": "warning"}
            })
        );
    }

    #[test]
    fn paging_response_tolerates_missing_fields() {
        let resp: PagingResponse =
            serde_json::from_str(r#"{"status": "success", "dedup_key": "abc"}"#).unwrap();
        assert_eq!(resp.dedup_key.as_deref(), Some("abc"));
        assert!(resp.errors.is_empty());
    }
}
