use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Restaurant segment labels. Closed set: every breakdown covers all three,
/// zero-filled when a segment has no activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    QuickService,
    CasualDining,
    FineDining,
}

impl Segment {
    pub const ALL: [Segment; 3] = [
        Segment::QuickService,
        Segment::CasualDining,
        Segment::FineDining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::QuickService => "quick_service",
            Segment::CasualDining => "casual_dining",
            Segment::FineDining => "fine_dining",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Segment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick_service" => Ok(Segment::QuickService),
            "casual_dining" => Ok(Segment::CasualDining),
            "fine_dining" => Ok(Segment::FineDining),
            other => Err(AppError::Validation(format!("unknown segment: {other}"))),
        }
    }
}

/// Lifecycle of a conversion. Upstream reconciliation moves pending
/// conversions to confirmed or rejected; this service only ever reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Pending => "pending",
            ConversionStatus::Confirmed => "confirmed",
            ConversionStatus::Rejected => "rejected",
        }
    }
}

/// Half-open timestamp interval: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start > end {
            return Err(AppError::InvalidPeriod(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range from inclusive calendar dates: `[from, to]` becomes
    /// `[from 00:00, to+1d 00:00)`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> AppResult<Self> {
        if from > to {
            return Err(AppError::InvalidPeriod(format!(
                "from date {from} is after to date {to}"
            )));
        }
        let start = from.and_time(NaiveTime::MIN).and_utc();
        let end = (to + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
        Ok(Self { start, end })
    }

    /// Trailing 24-hour window aligned to hour boundaries. The current
    /// partial hour is included as the last bucket.
    pub fn trailing_day(now: DateTime<Utc>) -> Self {
        let end = now
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now)
            + Duration::hours(1);
        Self {
            start: end - Duration::hours(24),
            end,
        }
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    /// Number of whole calendar days covered by the range.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_segment_round_trip() {
        for seg in Segment::ALL {
            assert_eq!(Segment::from_str(seg.as_str()).unwrap(), seg);
        }
        assert!(Segment::from_str("food_truck").is_err());
    }

    #[test]
    fn test_from_dates_inclusive() {
        let range = DateRange::from_dates(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
        )
        .unwrap();
        assert_eq!(range.days(), 7);
        assert_eq!(range.start.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(range.end.to_rfc3339(), "2025-01-08T00:00:00+00:00");
    }

    #[test]
    fn test_from_dates_rejects_inverted_range() {
        let result = DateRange::from_dates(
            NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_trailing_day_spans_24_hours() {
        let now = DateTime::parse_from_rfc3339("2025-06-15T14:37:21Z")
            .unwrap()
            .with_timezone(&Utc);
        let range = DateRange::trailing_day(now);
        assert_eq!(range.end.to_rfc3339(), "2025-06-15T15:00:00+00:00");
        assert_eq!((range.end - range.start).num_hours(), 24);
        // now itself falls inside the window
        assert!(range.start <= now && now < range.end);
    }
}
