use crate::error::AppError;
use crate::types::DateRange;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of named calendar periods. Unrecognized tokens are rejected
/// up front; nothing ever falls back to a default range silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodToken {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
}

impl PeriodToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodToken::Today => "today",
            PeriodToken::Yesterday => "yesterday",
            PeriodToken::ThisWeek => "this_week",
            PeriodToken::LastWeek => "last_week",
            PeriodToken::ThisMonth => "this_month",
            PeriodToken::LastMonth => "last_month",
        }
    }

    /// The immediately preceding comparable period. Fixed bidirectional map;
    /// tokens without a distinct predecessor map to themselves.
    pub fn previous(self) -> Self {
        match self {
            PeriodToken::Today => PeriodToken::Yesterday,
            PeriodToken::Yesterday => PeriodToken::Today,
            PeriodToken::ThisWeek => PeriodToken::LastWeek,
            PeriodToken::LastWeek => PeriodToken::ThisWeek,
            PeriodToken::ThisMonth => PeriodToken::LastMonth,
            PeriodToken::LastMonth => PeriodToken::ThisMonth,
        }
    }
}

impl std::fmt::Display for PeriodToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodToken {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(PeriodToken::Today),
            "yesterday" => Ok(PeriodToken::Yesterday),
            "this_week" => Ok(PeriodToken::ThisWeek),
            "last_week" => Ok(PeriodToken::LastWeek),
            "this_month" => Ok(PeriodToken::ThisMonth),
            "last_month" => Ok(PeriodToken::LastMonth),
            other => Err(AppError::InvalidPeriod(format!(
                "unknown period token: {other}"
            ))),
        }
    }
}

/// Resolve a token to a concrete `[start, end)` interval in the UTC
/// calendar: midnight to midnight, weeks starting Monday (ISO).
pub fn resolve(token: PeriodToken, now: DateTime<Utc>) -> DateRange {
    let today = now.date_naive();
    let (start, end) = match token {
        PeriodToken::Today => (today, today + Duration::days(1)),
        PeriodToken::Yesterday => (today - Duration::days(1), today),
        PeriodToken::ThisWeek => {
            let monday = week_start(today);
            (monday, monday + Duration::days(7))
        }
        PeriodToken::LastWeek => {
            let monday = week_start(today);
            (monday - Duration::days(7), monday)
        }
        PeriodToken::ThisMonth => (month_start(today), next_month_start(today)),
        PeriodToken::LastMonth => {
            let first = month_start(today);
            (month_start(first - Duration::days(1)), first)
        }
    };
    DateRange {
        start: midnight(start),
        end: midnight(end),
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("first of an existing month is always valid")
}

fn next_month_start(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of an existing month is always valid")
}
