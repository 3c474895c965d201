use crate::metrics::funnel::rate_pct;
use crate::metrics::types::SeriesRow;
use crate::store::{BucketCount, Granularity};
use crate::types::DateRange;
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::HashMap;

/// Generate the complete ordered bucket-key sequence for a range. Keys are
/// produced for every calendar unit in `[start, end)` whether or not any
/// event lands in them.
pub fn bucket_keys(range: &DateRange, granularity: Granularity) -> Vec<String> {
    let mut keys = Vec::new();
    match granularity {
        Granularity::Day => {
            let mut cursor = range.start.date_naive();
            let end = range.end.date_naive();
            // A range ending mid-day still owns that final partial day.
            let end = if range.end.time() == chrono::NaiveTime::MIN {
                end
            } else {
                end + Duration::days(1)
            };
            while cursor < end {
                keys.push(cursor.format("%Y-%m-%d").to_string());
                cursor += Duration::days(1);
            }
        }
        Granularity::Hour => {
            let mut cursor = truncate_hour(range.start);
            while cursor < range.end {
                keys.push(cursor.format("%Y-%m-%dT%H:00").to_string());
                cursor += Duration::hours(1);
            }
        }
    }
    keys
}

fn truncate_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Merge per-metric partial result lists into one contiguous, gap-filled,
/// ascending series. Partial-result keys outside the generated range are
/// dropped; CTR/CR are derived per bucket under the shared zero-denominator
/// policy.
pub fn build_series(
    range: &DateRange,
    granularity: Granularity,
    impressions: &[BucketCount],
    clicks: &[BucketCount],
    conversions: &[BucketCount],
) -> Vec<SeriesRow> {
    let mut rows: Vec<SeriesRow> = bucket_keys(range, granularity)
        .into_iter()
        .map(SeriesRow::zeroed)
        .collect();
    let index: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.bucket.clone(), i))
        .collect();

    let merge = |rows: &mut Vec<SeriesRow>, partial: &[BucketCount], set: fn(&mut SeriesRow, i64)| {
        for entry in partial {
            if let Some(&i) = index.get(&entry.bucket) {
                set(&mut rows[i], entry.count);
            }
        }
    };
    merge(&mut rows, impressions, |row, n| row.impressions = n);
    merge(&mut rows, clicks, |row, n| row.clicks = n);
    merge(&mut rows, conversions, |row, n| row.conversions = n);

    for row in &mut rows {
        row.ctr = rate_pct(row.clicks, row.impressions);
        row.cr = rate_pct(row.conversions, row.clicks);
    }
    rows
}
