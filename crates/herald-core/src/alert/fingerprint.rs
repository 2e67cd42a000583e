use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Alert;

const DELIMITER: u8 = 0xff;

/// Hex-encoded SHA-256 digest identifying an alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Identity of the underlying condition: labels and start time only.
    /// Firing and resolved notifications of one incident share it.
    pub fn incident(alert: &Alert) -> Self {
        let mut hasher = Sha256::new();
        write_map(&mut hasher, &alert.labels);
        write_str(&mut hasher, &alert.starts_at);
        Self(hex::encode(hasher.finalize()))
    }

    /// Identity of one notification instance.
    pub fn message(alert: &Alert) -> Self {
        let mut hasher = Sha256::new();
        write_map(&mut hasher, &alert.annotations);
        write_map(&mut hasher, &alert.labels);
        write_str(&mut hasher, &alert.starts_at);
        write_str(&mut hasher, alert.status.as_str());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// BTreeMap iterates in key order, which keeps the digest independent of
// insertion order.
fn write_map(hasher: &mut Sha256, map: &BTreeMap<String, String>) {
    for (k, v) in map {
        write_str(hasher, k);
        write_str(hasher, v);
    }
}

fn write_str(hasher: &mut Sha256, s: &str) {
    hasher.update(s.as_bytes());
    hasher.update([DELIMITER]);
}
