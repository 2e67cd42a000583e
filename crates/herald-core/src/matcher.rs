use std::collections::BTreeMap;

use crate::error::DomainError;

/// Label equality rules an alert must satisfy to be delivered. An empty
/// matcher accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMatcher {
    matchers: BTreeMap<String, String>,
}

impl LabelMatcher {
    pub fn new(matchers: BTreeMap<String, String>) -> Self {
        Self { matchers }
    }

    /// Parses `label=value` pairs; whitespace around either side is trimmed.
    pub fn parse<S: AsRef<str>>(pairs: &[S]) -> Result<Self, DomainError> {
        let mut matchers = BTreeMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let mut parts = pair.split('=');
            let (Some(k), Some(v), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(DomainError::InvalidLabelMatch(pair.to_string()));
            };
            matchers.insert(k.trim().to_string(), v.trim().to_string());
        }
        Ok(Self { matchers })
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Returns the first rule the labels violate, as `(label, expected)`.
    /// A missing label compares as the empty string.
    pub fn mismatch<'a>(
        &'a self,
        labels: &BTreeMap<String, String>,
    ) -> Option<(&'a str, &'a str)> {
        self.matchers
            .iter()
            .find(|(k, v)| {
                labels.get(*k).map(String::as_str).unwrap_or_default() != v.as_str()
            })
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.mismatch(labels).is_none()
    }
}
