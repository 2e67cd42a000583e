use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

const PROMETHEUS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// Rewrites RFC 3339 or Go `time.Time` strings as RFC 3339 in whole seconds.
pub fn normalize(raw: &str) -> Option<String> {
    let parsed = parse_grafana(raw).or_else(|| parse_prometheus(raw))?;
    Some(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Renders `at` the way Prometheus does, zone abbreviation included.
pub fn format_prometheus(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.9f +0000 UTC").to_string()
}

fn parse_grafana(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}

fn parse_prometheus(raw: &str) -> Option<DateTime<FixedOffset>> {
    // The trailing zone abbreviation carries no information the numeric
    // offset does not.
    let (head, zone) = raw.trim().rsplit_once(' ')?;
    if zone.is_empty() {
        return None;
    }
    DateTime::parse_from_str(head, PROMETHEUS_FORMAT).ok()
}
