use serde::{Deserialize, Serialize};

/// Severities accepted by the paging service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Error,
    Info,
}

impl Severity {
    /// Maps a `severity` label onto the paging enum. Anything unknown or
    /// missing becomes `Critical`: the paging service drops events whose
    /// severity it does not recognise.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("critical") => Self::Critical,
            Some("warning") => Self::Warning,
            Some("error") => Self::Error,
            Some("info") => Self::Info,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}
