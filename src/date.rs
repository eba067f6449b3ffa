use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

/// Half-open time window `[start, end)` for a search request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

impl SearchWindow {
    pub fn new(start: Option<OffsetDateTime>, end: Option<OffsetDateTime>) -> Self {
        Self { start, end }
    }

    /// Window covering the last `span` up to `now`.
    pub fn trailing(now: OffsetDateTime, span: Duration) -> Self {
        Self { start: Some(now - span), end: None }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Format as the API expects: UTC, second precision, `Z` suffix
/// (e.g. `2024-03-01T09:30:00Z`).
pub fn format_api_timestamp(ts: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    ts.to_offset(UtcOffset::UTC)
        .format(&fmt)
        .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

/// Parse an RFC 3339 `created_at` value.
pub fn parse_api_timestamp(s: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(s.trim(), &Rfc3339).with_context(|| format!("invalid RFC 3339 timestamp: {s:?}"))
}
